//! Mock repository gateway built on wiremock

use serde_json::json;
use std::io::Read;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount `GET /api/images/{id}` and its original-file listing
pub async fn mount_image(server: &MockServer, id: i64, name: &str, files: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path(format!("/api/images/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "name": name})))
        .mount(server)
        .await;

    let records: Vec<_> = files
        .iter()
        .map(|(dir, file)| json!({"path": dir, "name": file}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/images/{}/original-files", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

/// Make `GET /api/images/{id}` answer `status`
pub async fn mount_failing_image(server: &MockServer, id: i64, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/api/images/{}", id)))
        .respond_with(ResponseTemplate::new(status).set_body_string("busy"))
        .mount(server)
        .await;
}

/// Mount a dataset and its children
pub async fn mount_dataset(server: &MockServer, id: i64, name: &str, images: &[(i64, &str)]) {
    Mock::given(method("GET"))
        .and(path(format!("/api/datasets/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "name": name})))
        .mount(server)
        .await;

    let children: Vec<_> = images
        .iter()
        .map(|(image_id, image_name)| json!({"id": image_id, "name": image_name}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/datasets/{}/images", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(children))
        .mount(server)
        .await;
}

/// Mount both configuration keys
pub async fn mount_config(server: &MockServer, managed: &Path, converter: &Path) {
    for (key, value) in [
        ("omero.managed.dir", managed),
        ("omero.bf2raw.dir", converter),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/api/config/{}", key)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"value": value.to_str()})),
            )
            .mount(server)
            .await;
    }
}

/// Accept (or reject with `status`) file annotations for `image_id`
pub async fn mount_attach(server: &MockServer, image_id: i64, status: u16) {
    let template = if status < 300 {
        ResponseTemplate::new(status)
            .set_body_json(json!({"annotation_id": 500 + image_id, "file_id": 900 + image_id}))
    } else {
        ResponseTemplate::new(status).set_body_string("upload rejected")
    };
    Mock::given(method("POST"))
        .and(path(format!("/api/images/{}/file-annotations", image_id)))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Bodies of all annotation uploads received so far, with their request path
pub async fn uploads(server: &MockServer) -> Vec<(String, Vec<u8>)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| (r.url.path().to_string(), r.body))
        .collect()
}

/// Entry name -> content of a zip held in memory
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).expect("valid zip upload");
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("zip entry");
        let mut content = Vec::new();
        file.read_to_end(&mut content).expect("read zip entry");
        entries.push((file.name().to_string(), content));
    }
    entries.sort();
    entries
}
