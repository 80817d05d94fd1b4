mod common;

use std::{collections::HashSet, sync::atomic::Ordering, time::Duration};

use common::{spawn_api, ApiBehaviour};
use mushaf::{
    config::{Edition, PAGE_RANGE},
    download::{DownloadOptions, Downloader},
    Error, Settings,
};
use tempfile::TempDir;

fn settings(base_url: &str, dir: &TempDir) -> Settings {
    Settings::new(base_url, dir.path().join("data"), dir.path().join("db"))
}

#[tokio::test]
async fn full_edition_in_batches_of_twenty() {
    let (url, stats) = spawn_api(ApiBehaviour::default()).await;
    let dir = TempDir::new().unwrap();
    let settings = settings(&url, &dir);
    let options = DownloadOptions {
        batch_size: 20,
        max_concurrent: 10,
        ..Default::default()
    };

    let downloader = Downloader::new(settings.clone(), "ara-quransimple", options).unwrap();
    assert_eq!(downloader.batches().len(), 31);
    let report = downloader.download_all().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.batches, 31);
    assert_eq!(report.written, PAGE_RANGE.collect::<Vec<_>>());
    assert_eq!(stats.hits.load(Ordering::SeqCst), 604);

    for page in PAGE_RANGE {
        let raw = std::fs::read(settings.page_file(Edition::QuranSimple, page)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["pages"][0]["chapter"], page);
    }
    let files = std::fs::read_dir(downloader.output_dir()).unwrap().count();
    assert_eq!(files, 604);
}

#[tokio::test]
async fn body_is_written_verbatim() {
    let (url, _) = spawn_api(ApiBehaviour::default()).await;
    let dir = TempDir::new().unwrap();
    let settings = settings(&url, &dir);
    let options = DownloadOptions {
        pages: 7..=7,
        ..Default::default()
    };

    Downloader::new(settings.clone(), "ara-quranuthmanienc", options)
        .unwrap()
        .download_all()
        .await
        .unwrap();

    let written = std::fs::read_to_string(settings.page_file(Edition::UthmaniEnc, 7)).unwrap();
    assert_eq!(written, common::page_body(7));
}

#[tokio::test]
async fn invalid_edition_never_reaches_the_network() {
    let (url, stats) = spawn_api(ApiBehaviour::default()).await;
    let dir = TempDir::new().unwrap();

    let err = Downloader::new(settings(&url, &dir), "eng-ummmuhammad", DownloadOptions::default())
        .unwrap_err();

    assert!(matches!(err, Error::InvalidEdition(_)));
    assert_eq!(stats.hits.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("data").exists());
}

#[tokio::test]
async fn failed_pages_are_reported_and_the_run_continues() {
    let behaviour = ApiBehaviour {
        server_error: HashSet::from([3]),
        not_json: HashSet::from([5]),
        ..Default::default()
    };
    let (url, stats) = spawn_api(behaviour).await;
    let dir = TempDir::new().unwrap();
    let settings = settings(&url, &dir);
    let options = DownloadOptions {
        batch_size: 4,
        max_concurrent: 2,
        pages: 1..=10,
    };

    let report = Downloader::new(settings.clone(), "ara-quranuthmanihaf", options)
        .unwrap()
        .download_all()
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.batches, 3);
    assert_eq!(report.written, vec![1, 2, 4, 6, 7, 8, 9, 10]);
    let failed: Vec<u32> = report.failed.iter().map(|f| f.page).collect();
    assert_eq!(failed, vec![3, 5]);
    assert!(report.failed[0].reason.contains("500"));
    // Not retried.
    assert_eq!(stats.hits.load(Ordering::SeqCst), 10);
    assert!(!settings.page_file(Edition::UthmaniHafs, 3).exists());
    assert!(!settings.page_file(Edition::UthmaniHafs, 5).exists());
}

#[tokio::test]
async fn requests_in_flight_never_exceed_the_limit() {
    let behaviour = ApiBehaviour {
        delay: Some(Duration::from_millis(20)),
        ..Default::default()
    };
    let (url, stats) = spawn_api(behaviour).await;
    let dir = TempDir::new().unwrap();
    let options = DownloadOptions {
        batch_size: 12,
        max_concurrent: 3,
        pages: 1..=24,
    };

    let report = Downloader::new(settings(&url, &dir), "ara-quranuthmanihaf1", options)
        .unwrap()
        .download_all()
        .await
        .unwrap();

    assert_eq!(report.written.len(), 24);
    let max = stats.max_in_flight.load(Ordering::SeqCst);
    assert!((1..=3).contains(&max), "max in flight was {max}");
}

#[tokio::test]
async fn unwritable_page_is_a_failure_of_that_page_only() {
    let (url, stats) = spawn_api(ApiBehaviour::default()).await;
    let dir = TempDir::new().unwrap();
    let settings = settings(&url, &dir);
    // A directory where the first page file should go makes its write fail.
    std::fs::create_dir_all(settings.page_file(Edition::QuranSimple, 1)).unwrap();
    let options = DownloadOptions {
        batch_size: 1,
        max_concurrent: 1,
        pages: 1..=3,
    };

    let report = Downloader::new(settings.clone(), "ara-quransimple", options)
        .unwrap()
        .download_all()
        .await
        .unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.written, vec![2, 3]);
    let failed: Vec<u32> = report.failed.iter().map(|f| f.page).collect();
    assert_eq!(failed, vec![1]);
    assert_eq!(stats.hits.load(Ordering::SeqCst), 3);
    assert!(settings.page_file(Edition::QuranSimple, 2).is_file());
    assert!(settings.page_file(Edition::QuranSimple, 3).is_file());
}
