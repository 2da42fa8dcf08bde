mod common;

use std::time::Duration;

use common::{test_config, FakeBrowser};
use payslip_downloader::app::{report, run_session};
use payslip_downloader::download::ScratchDir;
use payslip_downloader::models::PeriodFilter;
use payslip_downloader::portal::{selectors, PortalSession};
use payslip_downloader::RunError;

const MARCH: &str = "Lohnabrechnung_0815_4711_Brutto_202403_20240405_153000_1.pdf";
const APRIL: &str = "Lohnabrechnung_0815_4711_Brutto_202404_20240503_091500_1.pdf";

fn fast(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms)
}

#[tokio::test]
async fn test_login_types_credentials_and_submits() {
    let scratch = ScratchDir::new().unwrap();
    let config = test_config("out.pdf");
    let browser = FakeBrowser::new(0, "Letzte 7 Tage");

    PortalSession::new(&browser, &config, &scratch).login().await.unwrap();

    assert_eq!(
        browser.typed(),
        vec![
            (selectors::client_number_field().to_string(), "12345".to_string()),
            (selectors::username_field().to_string(), "jdoe".to_string()),
            (selectors::password_field().to_string(), "secret".to_string()),
        ]
    );
    assert_eq!(browser.clicked(&selectors::login_button()), 1);
}

#[tokio::test]
async fn test_week_period_selects_week_filter() {
    let scratch = ScratchDir::new().unwrap();
    let config = test_config("out.pdf");
    let browser = FakeBrowser::new(0, "Aktueller Monat").with_close_button();

    let changed = PortalSession::new(&browser, &config, &scratch)
        .select_period_filter()
        .await
        .unwrap();

    assert!(changed);
    assert_eq!(
        browser.clicks(),
        vec![
            selectors::filter_close().to_string(),
            selectors::filter_dropdown().to_string(),
            selectors::filter_entry(PeriodFilter::Week).to_string(),
        ]
    );
}

#[tokio::test]
async fn test_other_periods_select_month_filter() {
    let scratch = ScratchDir::new().unwrap();
    let mut config = test_config("out.pdf");
    config.file.search_period = "30".to_string();
    let browser = FakeBrowser::new(0, "Letzte 7 Tage");

    PortalSession::new(&browser, &config, &scratch)
        .select_period_filter()
        .await
        .unwrap();

    // No close button shown, so only the dropdown and the entry are clicked.
    assert_eq!(
        browser.clicks(),
        vec![
            selectors::filter_dropdown().to_string(),
            selectors::filter_entry(PeriodFilter::Month).to_string(),
        ]
    );
}

#[tokio::test]
async fn test_matching_filter_is_left_alone() {
    let scratch = ScratchDir::new().unwrap();
    let config = test_config("out.pdf");
    let browser = FakeBrowser::new(0, "Letzte 7 Tage").with_close_button();

    let changed = PortalSession::new(&browser, &config, &scratch)
        .select_period_filter()
        .await
        .unwrap();

    assert!(!changed);
    assert!(browser.clicks().is_empty());
}

#[tokio::test]
async fn test_full_run_downloads_and_renames_each_row() {
    let scratch = ScratchDir::new().unwrap();
    let out = tempfile::tempdir().unwrap();
    let template = format!(
        "{}/{{accounting_period%Y-%m}}/{{create_date%Y%m%d_%H%M%S}}.pdf",
        out.path().display()
    );
    let config = test_config(&template);
    let browser = FakeBrowser::new(2, "Letzte 7 Tage").with_downloads(scratch.path(), &[MARCH, APRIL]);

    let summary = PortalSession::new(&browser, &config, &scratch)
        .with_poll_interval(fast(10))
        .run()
        .await
        .unwrap();

    assert_eq!(browser.visited(), vec!["https://portal.example/login".to_string()]);
    assert_eq!(summary.documents, 2);
    assert_eq!(
        summary.copied,
        vec![
            out.path().join("2024-03").join("20240405_153000.pdf"),
            out.path().join("2024-04").join("20240503_091500.pdf"),
        ]
    );
    for path in &summary.copied {
        assert!(path.exists(), "{} missing", path.display());
    }

    assert_eq!(browser.clicked(&selectors::document_row(1)), 1);
    assert_eq!(browser.clicked(&selectors::document_row(2)), 1);
    assert_eq!(browser.clicked(&selectors::download_entry()), 2);
    assert_eq!(browser.clicked(&selectors::breadcrumb_home()), 2);
}

#[tokio::test]
async fn test_literal_destination_ignores_rename_flag() {
    for rename in [true, false] {
        let scratch = ScratchDir::new().unwrap();
        let out = tempfile::tempdir().unwrap();
        let destination = out.path().join("payslips").join("latest.pdf");
        let mut config = test_config(&destination.display().to_string());
        config.file.rename = rename;
        let browser = FakeBrowser::new(1, "Letzte 7 Tage").with_downloads(scratch.path(), &[MARCH]);

        let summary = PortalSession::new(&browser, &config, &scratch)
            .with_poll_interval(fast(10))
            .download_payslips()
            .await
            .unwrap();

        assert_eq!(summary.copied, vec![destination.clone()]);
        assert!(destination.exists());
    }
}

#[tokio::test]
async fn test_dry_run_never_downloads() {
    let mut scratch = ScratchDir::new().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut config = test_config(&out.path().join("x.pdf").display().to_string());
    config.debug.dry_run = true;
    let browser = FakeBrowser::new(3, "Letzte 7 Tage").with_downloads(scratch.path(), &[MARCH, APRIL]);

    let summary = PortalSession::new(&browser, &config, &scratch).run().await.unwrap();

    assert_eq!(summary.documents, 3);
    assert!(summary.copied.is_empty());
    assert_eq!(browser.clicked(&selectors::download_entry()), 0);
    assert_eq!(browser.clicked(&selectors::actions_button()), 3);
    assert_eq!(browser.clicked(&selectors::breadcrumb_home()), 3);
    assert!(scratch.completed_files().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);

    let path = scratch.path().to_path_buf();
    scratch.close().unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_missing_download_times_out_without_copying() {
    let scratch = ScratchDir::new().unwrap();
    let out = tempfile::tempdir().unwrap();
    let config = test_config(&out.path().join("x.pdf").display().to_string());
    // The portal never delivers a file.
    let browser = FakeBrowser::new(2, "Letzte 7 Tage").with_downloads(scratch.path(), &[]);

    let err = PortalSession::new(&browser, &config, &scratch)
        .with_poll_interval(fast(50))
        .download_payslips()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::DownloadTimeout { timeout, .. } if timeout == Duration::from_secs(1)));
    assert!(err.is_timeout());
    assert_eq!(browser.clicked(&selectors::download_entry()), 1);
    // Stopped at the first row: no navigation back, nothing copied.
    assert_eq!(browser.clicked(&selectors::breadcrumb_home()), 0);
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invisible_row_fails_with_element_timeout() {
    let scratch = ScratchDir::new().unwrap();
    let config = test_config("out.pdf");
    let browser = FakeBrowser::new(1, "Letzte 7 Tage").hide(&selectors::document_row(1));

    let err = PortalSession::new(&browser, &config, &scratch)
        .download_payslips()
        .await
        .unwrap_err();

    match err {
        RunError::ElementTimeout { selector, .. } => {
            assert_eq!(selector, selectors::document_row(1).to_string());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(browser.clicks().is_empty());
}

#[tokio::test]
async fn test_malformed_download_name_fails_run() {
    let scratch = ScratchDir::new().unwrap();
    let out = tempfile::tempdir().unwrap();
    let template = format!("{}/{{create_date%Y}}.pdf", out.path().display());
    let config = test_config(&template);
    let browser = FakeBrowser::new(1, "Letzte 7 Tage").with_downloads(scratch.path(), &["payslip.pdf"]);

    let err = PortalSession::new(&browser, &config, &scratch)
        .with_poll_interval(fast(10))
        .download_payslips()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::MalformedFileName { .. }));
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn test_session_removes_scratch_after_success() {
    let scratch = ScratchDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let out = tempfile::tempdir().unwrap();
    let template = format!("{}/{{accounting_period%Y-%m}}.pdf", out.path().display());
    let config = test_config(&template);
    let browser = FakeBrowser::new(1, "Letzte 7 Tage").with_downloads(&scratch_path, &[MARCH]);

    let summary = run_session(&browser, &config, scratch).await.unwrap();

    assert_eq!(summary.copied, vec![out.path().join("2024-03.pdf")]);
    assert!(summary.copied[0].exists());
    assert!(browser.has_quit());
    assert!(!scratch_path.exists());
}

#[tokio::test]
async fn test_session_removes_scratch_after_download_timeout() {
    let scratch = ScratchDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let out = tempfile::tempdir().unwrap();
    let config = test_config(&out.path().join("x.pdf").display().to_string());
    let browser = FakeBrowser::new(1, "Letzte 7 Tage").with_downloads(&scratch_path, &[]);

    let err = run_session(&browser, &config, scratch).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::DownloadTimeout { .. })));
    assert_eq!(report(&err), 1);
    assert!(browser.has_quit());
    assert!(!scratch_path.exists());
}

#[tokio::test]
async fn test_session_removes_scratch_after_element_timeout() {
    let scratch = ScratchDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let config = test_config("out.pdf");
    let browser = FakeBrowser::new(1, "Letzte 7 Tage").hide(&selectors::client_number_field());

    let err = run_session(&browser, &config, scratch).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::ElementTimeout { .. })));
    assert_eq!(report(&err), 1);
    assert!(browser.has_quit());
    assert!(!scratch_path.exists());
}

#[tokio::test]
async fn test_session_removes_scratch_after_malformed_name() {
    let scratch = ScratchDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let out = tempfile::tempdir().unwrap();
    let template = format!("{}/{{create_date%Y}}.pdf", out.path().display());
    let config = test_config(&template);
    let browser = FakeBrowser::new(1, "Letzte 7 Tage").with_downloads(&scratch_path, &["payslip.pdf"]);

    let err = run_session(&browser, &config, scratch).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::MalformedFileName { .. })));
    assert_eq!(report(&err), 1);
    assert!(!scratch_path.exists());
}

#[test]
fn test_report_maps_errors_to_exit_status() {
    let element = anyhow::Error::from(RunError::ElementTimeout {
        selector: selectors::document_row(1).to_string(),
        timeout: Duration::from_secs(30),
    });
    let download = anyhow::Error::from(RunError::DownloadTimeout {
        folder: std::env::temp_dir(),
        timeout: Duration::from_secs(20),
    });

    assert_eq!(report(&element), 1);
    assert_eq!(report(&download), 1);
    assert_eq!(report(&anyhow::Error::from(RunError::Interrupted)), 130);
    assert_eq!(report(&anyhow::anyhow!("chromedriver did not start")), 1);
}
