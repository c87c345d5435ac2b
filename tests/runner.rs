mod common;

use common::{Reply, ScriptedServer, V1, V2, config_for, manifest_json};
use docker_image_puller::PullerError;
use docker_image_puller::cli::{Args, BatchSummary, Runner};
use std::io::Write;
use tempfile::NamedTempFile;

fn input_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn args_for(file: &NamedTempFile) -> Args {
    Args {
        file: Some(file.path().to_string_lossy().into_owned()),
        verbose: false,
    }
}

async fn two_layer_registry() -> ScriptedServer {
    ScriptedServer::start(|req, _| {
        if req.path.starts_with("/token") {
            Reply::json(r#"{"token":"t0k"}"#, "application/json")
        } else if req.path.contains("/manifests/") {
            let repo = req
                .path
                .trim_start_matches("/v2/")
                .split("/manifests/")
                .next()
                .unwrap_or_default()
                .replace('/', "-");
            let first = format!("sha256:{}-1", repo);
            let second = format!("sha256:{}-2", repo);
            Reply::json(manifest_json(&[(&first, 3), (&second, 3)]), V2)
        } else {
            Reply::ok(b"abc".to_vec())
        }
    })
    .await
}

fn scope_values(path: &str) -> Vec<String> {
    let url = url::Url::parse(&format!("http://registry.test{}", path)).unwrap();
    url.query_pairs()
        .filter(|(k, _)| k == "scope")
        .map(|(_, v)| v.into_owned())
        .collect()
}

#[tokio::test]
async fn pulls_images_in_file_order() {
    let server = two_layer_registry().await;
    let file = input_file("library/alpine:latest\n\nlibrary/busybox:1.36\r\nmy/app:v2\n");

    let summary = Runner::new(args_for(&file), config_for(&server.base_url))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.images(), 3);
    assert_eq!(summary.succeeded(), 3);
    assert_eq!(summary.layers(), 6);
    assert_eq!(summary.bytes(), 18);
    assert_eq!(summary.transport.requests, 15);
    assert_eq!(summary.transport.retries, 0);

    let requests = server.requests();
    assert_eq!(requests.len(), 15);

    let images = [
        ("library/alpine", "latest"),
        ("library/busybox", "1.36"),
        ("my/app", "v2"),
    ];
    for (chunk, (repo, tag)) in requests.chunks(5).zip(images) {
        assert!(chunk[0].path.starts_with("/token?"), "{}", chunk[0].path);
        assert_eq!(
            scope_values(&chunk[0].path),
            vec![
                format!("repository:{}:*", repo),
                format!("repository(plugin):{}:*", repo)
            ]
        );

        let manifest_path = format!("/v2/{}/manifests/{}", repo, tag);
        assert_eq!(chunk[1].path, manifest_path);
        assert_eq!(chunk[1].header("accept"), Some(V1));
        assert_eq!(chunk[2].path, manifest_path);
        assert_eq!(chunk[2].header("accept"), Some(V2));

        let prefix = repo.replace('/', "-");
        assert_eq!(chunk[3].path, format!("/v2/{}/blobs/sha256:{}-1", repo, prefix));
        assert_eq!(chunk[4].path, format!("/v2/{}/blobs/sha256:{}-2", repo, prefix));
        for request in &chunk[1..] {
            assert_eq!(request.header("authorization"), Some("Bearer t0k"));
        }
    }
}

#[tokio::test]
async fn rerunning_the_same_file_repeats_the_same_requests() {
    let server = two_layer_registry().await;
    let file = input_file("library/alpine:latest\nmy/app:v2\n");
    let runner = Runner::new(args_for(&file), config_for(&server.base_url));

    let first = runner.run().await.unwrap();
    let first_paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();
    let second = runner.run().await.unwrap();
    let all_paths: Vec<String> = server.requests().into_iter().map(|r| r.path).collect();

    assert_eq!(first_paths.len(), 10);
    assert_eq!(all_paths.len(), 20);
    assert_eq!(&all_paths[..10], &all_paths[10..]);

    let advertised = |summary: &BatchSummary| -> Vec<(String, Option<String>)> {
        summary
            .reports
            .iter()
            .flat_map(|r| r.blobs.iter())
            .map(|b| (b.digest.clone(), b.advertised_size.clone()))
            .collect()
    };
    assert_eq!(advertised(&first), advertised(&second));
    assert!(advertised(&first).iter().all(|(_, size)| size.as_deref() == Some("3")));
    assert_eq!(first.bytes(), second.bytes());
}

#[tokio::test]
async fn empty_file_issues_no_requests() {
    let server = two_layer_registry().await;
    let file = input_file("\n\n");

    let summary = Runner::new(args_for(&file), config_for(&server.base_url))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.images(), 0);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn malformed_line_stops_the_batch() {
    let server = two_layer_registry().await;
    let file = input_file("library/alpine:latest\nbad_line_no_colon\nlibrary/busybox:latest\n");

    let err = Runner::new(args_for(&file), config_for(&server.base_url))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PullerError::InvalidReference(ref line) if line == "bad_line_no_colon"));
    assert!(err.is_fatal());
    assert_eq!(server.hits("/v2/library/alpine/"), 4);
    assert_eq!(server.hits("/v2/library/busybox/"), 0);
    assert_eq!(server.hits("/token"), 1);
}

#[tokio::test]
async fn missing_file_is_a_setup_error() {
    let args = Args {
        file: Some("/nonexistent/images.txt".to_string()),
        verbose: false,
    };
    let err = Runner::new(args, config_for("http://127.0.0.1:9"))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, PullerError::Io(_)));
    assert!(err.to_string().contains("/nonexistent/images.txt"));
}

#[tokio::test]
async fn missing_flag_is_a_setup_error() {
    let err = Runner::new(Args::default(), config_for("http://127.0.0.1:9"))
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("File is required"));
}
