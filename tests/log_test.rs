use core_lib::log::logger::Logger;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tokio::fs;

#[tokio::test]
async fn test_log_basic() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("logs").join("test.log");
    let logger = Logger::new(&file_path).await?;

    logger.try_log("INFO", "Hello World").await?;
    let contents = fs::read_to_string(&file_path).await?;
    assert!(contents.contains("Hello World"));
    assert_eq!(logger.path(), Some(file_path.as_path()));

    Ok(())
}

#[tokio::test]
async fn test_every_level_lands_in_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("multi.log");
    let logger = Logger::new(&file_path).await?;
    logger.info("test info").await;
    logger.warning("test warning").await;
    logger.error("test error").await;
    logger.push_ok("a.txt (HTTP 204)").await;
    logger.push_fail("b.txt (HTTP 500: bad file)").await;

    let contents = fs::read_to_string(&file_path).await?;

    assert_eq!(contents.lines().count(), 5);
    assert!(contents.contains("test info"));
    assert!(contents.contains("test warning"));
    assert!(contents.contains("test error"));
    assert!(contents.contains("PUSH OK"));
    assert!(contents.contains("bad file"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_log_writes() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("multi.log");
    let logger = Logger::new(&file_path).await?;

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let logger = logger.clone();
            tokio::spawn(async move {
                logger.try_log("INFO", &format!("message {i}")).await.unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.await?;
    }

    let contents = fs::read_to_string(&file_path).await?;
    assert_eq!(contents.lines().count(), 10);
    for i in 0..10 {
        assert!(contents.contains(&format!("message {i}")));
    }

    Ok(())
}

#[tokio::test]
async fn test_placeholder_writes_nothing() -> anyhow::Result<()> {
    let logger = Logger::placeholder();
    logger.try_log("INFO", "dropped").await?;
    logger.error("dropped too").await;
    assert_eq!(logger.path(), None);
    Ok(())
}

#[tokio::test]
async fn test_tail_returns_last_lines_in_order() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("tail.log");
    let logger = Logger::new(&file_path).await?;
    for i in 0..20 {
        logger.info(&format!("line {i}")).await;
    }

    let last = Logger::tail(&file_path, 3).await?;
    assert_eq!(last.len(), 3);
    assert!(last[0].ends_with("line 17"));
    assert!(last[2].ends_with("line 19"));

    let all = Logger::tail(&file_path, 100).await?;
    assert_eq!(all.len(), 20);
    assert!(all[0].ends_with("line 0"));
    Ok(())
}

#[tokio::test]
async fn test_tail_spans_read_chunks() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("big.log");
    let long = "x".repeat(3000);
    let body: String = (0..6).map(|i| format!("{i}{long}\n")).collect();
    fs::write(&file_path, body).await?;

    let last = Logger::tail(&file_path, 4).await?;
    assert_eq!(last.len(), 4);
    for (line, i) in last.iter().zip(2..6) {
        assert_eq!(line, &format!("{i}{long}"));
    }
    Ok(())
}

#[tokio::test]
async fn test_tail_keeps_multibyte_char_across_chunks() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("utf8.log");
    // the 8192-byte read from the end starts inside the 3 bytes of `文`
    let last = format!("{}文{}", "a".repeat(10), "b".repeat(8189));
    fs::write(&file_path, format!("first\n{last}\n")).await?;

    let tail = Logger::tail(&file_path, 1).await?;
    assert_eq!(tail, vec![last.clone()]);

    let both = Logger::tail(&file_path, 2).await?;
    assert_eq!(both, vec!["first".to_string(), last]);
    Ok(())
}

#[tokio::test]
async fn test_tail_missing_file_fails() -> anyhow::Result<()> {
    let dir = tempdir()?;
    assert!(Logger::tail(&dir.path().join("none.log"), 5).await.is_err());
    Ok(())
}
