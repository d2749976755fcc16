//! End-to-end runs of the whole pipeline against a mock GitHub, exercising
//! the real filesystem cache, PATH publication, and self-check execution.

#![cfg(all(target_os = "linux", target_arch = "x86_64"))]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;

use assert_fs::TempDir;
use clap::Parser;
use httpmock::prelude::*;
use serial_test::serial;
use speculoos::prelude::*;

use setup_marine::cli::SetupMarine;

struct Runner {
    _workdir: TempDir,
    tool_cache: std::path::PathBuf,
    github_path: std::path::PathBuf,
}

impl Runner {
    fn new() -> Self {
        let workdir = TempDir::new().unwrap();
        let tool_cache = workdir.path().join("tool-cache");
        let github_path = workdir.path().join("github_path");
        std::fs::create_dir_all(&tool_cache).unwrap();
        std::fs::write(&github_path, "").unwrap();
        Self {
            _workdir: workdir,
            tool_cache,
            github_path,
        }
    }

    fn temp_dir(&self) -> std::path::PathBuf {
        let temp = self._workdir.path().join("scratch");
        std::fs::create_dir_all(&temp).unwrap();
        temp
    }

    fn app(&self, server: &MockServer, extra: &[&str]) -> SetupMarine {
        let tool_cache = self.tool_cache.to_str().unwrap().to_string();
        let github_path = self.github_path.to_str().unwrap().to_string();
        let temp_dir = self.temp_dir().to_str().unwrap().to_string();
        let api_url = server.base_url();
        let download_base = server.url("/dl");
        let mut argv = vec![
            "setup-marine".to_string(),
            "--repo".to_string(),
            "fluencelabs/marine".to_string(),
            "--tool-cache".to_string(),
            tool_cache,
            "--github-path".to_string(),
            github_path,
            "--temp-dir".to_string(),
            temp_dir,
            "--api-url".to_string(),
            api_url,
            "--download-base".to_string(),
            download_base,
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        SetupMarine::try_parse_from(argv).expect("args did not parse")
    }

    fn cached_binary(&self, version_slot: &str) -> std::path::PathBuf {
        self.tool_cache
            .join("marine")
            .join(version_slot)
            .join("linux-x86_64")
            .join("marine")
    }
}

fn mock_releases(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/repos/fluencelabs/marine/releases");
        then.status(200).json_body(serde_json::json!([
            { "tag_name": "marine-v2.0.0" },
            { "tag_name": "marine-v1.9.0" },
            { "tag_name": "other-v9.9.9" },
        ]));
    })
}

fn mock_download<'a>(server: &'a MockServer, body: &str) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path("/dl/marine-v2.0.0/marine-linux-x86_64");
        then.status(200).body(body);
    })
}

fn zip_with_binary(contents: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("dist/marine", options).unwrap();
    writer.write_all(contents).unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
#[serial]
async fn latest_release_is_resolved_downloaded_cached_and_installed() {
    let server = MockServer::start();
    let releases = mock_releases(&server);
    let download = mock_download(&server, "#!/bin/sh\necho marine 2.0.0");

    let runner = Runner::new();
    let result = runner.app(&server, &["--version", "latest"]).run().await;

    assert_that!(result).is_ok();
    releases.assert_calls(1);
    download.assert_calls(1);

    let cached = runner.cached_binary("2.0.0");
    assert_that!(cached.is_file()).is_true();
    let mode = std::fs::metadata(&cached).unwrap().permissions().mode();
    assert_that!(mode & 0o755).is_equal_to(0o755);

    let published = std::fs::read_to_string(&runner.github_path).unwrap();
    let bin_dir = cached.parent().unwrap().to_str().unwrap();
    assert_that!(published).contains(bin_dir);
}

#[tokio::test]
#[serial]
async fn a_second_run_hits_the_cache_and_skips_the_download() {
    let server = MockServer::start();
    mock_releases(&server);
    let download = mock_download(&server, "#!/bin/sh\necho marine 2.0.0");

    let runner = Runner::new();
    runner
        .app(&server, &["--version", "latest"])
        .run()
        .await
        .expect("first run failed");
    runner
        .app(&server, &["--version", "latest"])
        .run()
        .await
        .expect("second run failed");

    download.assert_calls(1);
}

#[tokio::test]
#[serial]
async fn an_explicit_version_skips_the_release_index() {
    let server = MockServer::start();
    let releases = mock_releases(&server);
    let download = mock_download(&server, "#!/bin/sh\necho marine 2.0.0");

    let runner = Runner::new();
    let result = runner.app(&server, &["--version", "v2.0.0"]).run().await;

    assert_that!(result).is_ok();
    releases.assert_calls(0);
    download.assert_calls(1);
}

#[tokio::test]
#[serial]
async fn a_missing_artifact_falls_back_to_the_release_path() {
    let server = MockServer::start();
    let artifacts = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/fluencelabs/marine/actions/artifacts");
        then.status(200)
            .json_body(serde_json::json!({ "artifacts": [] }));
    });
    mock_releases(&server);
    let download = mock_download(&server, "#!/bin/sh\necho marine 2.0.0");

    let runner = Runner::new();
    let result = runner
        .app(
            &server,
            &["--version", "latest", "--artifact-name", "marine-nightly"],
        )
        .run()
        .await;

    assert_that!(result).is_ok();
    artifacts.assert_calls(1);
    download.assert_calls(1);
}

#[tokio::test]
#[serial]
async fn a_present_artifact_short_circuits_the_release_path() {
    let server = MockServer::start();
    let archive = zip_with_binary(b"#!/bin/sh\necho marine nightly");
    let archive_url = server.url("/artifact-archive.zip");
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/fluencelabs/marine/actions/artifacts");
        then.status(200).json_body(serde_json::json!({
            "artifacts": [
                { "name": "marine-nightly", "archive_download_url": archive_url },
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/artifact-archive.zip");
        then.status(200).body(archive.clone());
    });
    let releases = mock_releases(&server);
    let download = mock_download(&server, "#!/bin/sh\necho marine 2.0.0");

    let runner = Runner::new();
    let result = runner
        .app(
            &server,
            &["--version", "latest", "--artifact-name", "marine-nightly"],
        )
        .run()
        .await;

    assert_that!(result).is_ok();
    releases.assert_calls(0);
    download.assert_calls(0);

    let cached = runner.cached_binary("artifact-marine-nightly");
    assert_that!(cached.is_file()).is_true();
    let contents = std::fs::read(&cached).unwrap();
    assert_that!(contents).is_equal_to(b"#!/bin/sh\necho marine nightly".to_vec());
}

#[tokio::test]
#[serial]
async fn a_binary_that_fails_its_self_check_fails_the_run() {
    let server = MockServer::start();
    mock_releases(&server);
    mock_download(&server, "#!/bin/sh\nexit 1");

    let runner = Runner::new();
    let result = runner.app(&server, &["--version", "latest"]).run().await;

    let error = result.expect_err("the run should have failed");
    assert_that!(error.to_string()).contains("self-check");

    // permission-setting is not rolled back on self-check failure
    let cached = runner.cached_binary("2.0.0");
    let mode = std::fs::metadata(&cached).unwrap().permissions().mode();
    assert_that!(mode & 0o111).is_equal_to(0o111);
}
