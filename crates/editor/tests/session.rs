//! End-to-end tests of the editing session against real collaborators: an
//! axum server standing in for the hosting origin, and temp directories for
//! file handles and downloads.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use herbari_assets::DiscoveryMethod;
use herbari_core::environment::HostingMode;
use herbari_core::import::parse_catalog;
use herbari_core::model::ImageCategory;
use herbari_core::notice::NoticeLevel;
use herbari_core::record::RecordInput;
use herbari_editor::{EditorConfig, EditorError, EditorSession};
use herbari_persist::handle::{FixedPathPicker, UnsupportedPicker};
use herbari_persist::{ExportOutcome, SaveOutcome};
use serde_json::json;

const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

fn catalog_json() -> serde_json::Value {
    json!({
        "plantes": [{
            "id": "rosa_roja",
            "nom_comu": "Rosa Roja",
            "nom_cientific": "Rosa gallica",
            "familia": "Rosaceae",
            "caracteristiques": { "floracio": "Primavera, Estiu", "alcada": "1 m" },
            "imatges": [{ "type": "flor", "nom": "rosa_gallica_00_flor.jpg" }],
            "observacions": "Revisat al camp"
        }]
    })
}

// ---------------------------------------------------------------------------
// Fake origin
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Origin {
    posted: Arc<Mutex<Vec<String>>>,
}

async fn catalog() -> Json<serde_json::Value> {
    Json(catalog_json())
}

async fn image(UrlPath(name): UrlPath<String>) -> Response {
    match name.as_str() {
        "rosa_gallica_00_flor.jpg" => JPEG_HEADER.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn save_json(State(origin): State<Origin>, body: String) -> Json<serde_json::Value> {
    origin.posted.lock().unwrap().push(body);
    Json(json!({ "success": true }))
}

async fn spawn_origin() -> (SocketAddr, Origin) {
    let origin = Origin::default();
    let app = Router::new()
        .route("/dades/plantes.json", get(catalog))
        .route("/assets/imatges/{name}", get(image))
        .route("/save_json.php", post(save_json))
        .with_state(origin.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, origin)
}

fn config(vars: &[(&str, String)], downloads: &Path) -> EditorConfig {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    map.insert("HERBARI_DOWNLOAD_DIR".into(), downloads.display().to_string());
    map.insert("HERBARI_PROBE_TIMEOUT_MS".into(), "2000".into());
    EditorConfig::from_lookup(|name| map.get(name).cloned()).unwrap()
}

// ---------------------------------------------------------------------------
// Test: local server with legacy endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_server_edit_is_saved_through_legacy_endpoint() {
    let (addr, origin) = spawn_origin().await;
    let downloads = tempfile::tempdir().unwrap();
    let config = config(&[("HERBARI_ORIGIN", format!("http://{addr}/"))], downloads.path());
    let mut session = EditorSession::new(config, Arc::new(UnsupportedPicker)).unwrap();
    assert_eq!(session.environment().mode, HostingMode::LocalServer);

    let notice = session.load_initial().await;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(session.store().len(), 1);
    assert!(!session.is_dirty());

    let discovery = session.begin_edit(Some("rosa_roja")).await.unwrap();
    assert_eq!(discovery.found.len(), 1);

    let attached = downloads.path().join("nova_flor.jpg");
    std::fs::write(&attached, JPEG_HEADER).unwrap();
    session.edit_buffer_mut().unwrap().attach_pending(&attached);

    let original = session.edit_session().unwrap().original().unwrap().clone();
    let mut input = RecordInput::from_record(&original);
    input.description = "Rosa de flor vermella".into();

    let report = session.commit_edit(input, false).await.unwrap();

    assert_eq!(report.id, "rosa_roja");
    assert_matches!(report.outcome, SaveOutcome::LegacyEndpoint { .. });
    assert_eq!(report.uploads.len(), 1);
    // 00_flor is already on the server.
    assert_eq!(report.uploads[0].1, "rosa_gallica_01_flor.jpg");
    assert!(!session.is_dirty());
    assert!(session.edit_session().is_none());

    let posted = origin.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    let saved = parse_catalog(posted[0].as_bytes()).unwrap();
    assert_eq!(saved[0].description, "Rosa de flor vermella");
    assert_eq!(saved[0].images.len(), 2);
    assert_eq!(saved[0].extra["observacions"], "Revisat al camp");

    let staged = session.stage_uploads(&report.uploads).await.unwrap();
    assert_eq!(staged, [downloads.path().join("rosa_gallica_01_flor.jpg")]);
}

#[tokio::test]
async fn relabelled_image_yields_rename_script() {
    let (addr, _origin) = spawn_origin().await;
    let downloads = tempfile::tempdir().unwrap();
    let config = config(&[("HERBARI_ORIGIN", format!("http://{addr}/"))], downloads.path());
    let mut session = EditorSession::new(config, Arc::new(UnsupportedPicker)).unwrap();
    session.load_initial().await;

    session.begin_edit(Some("rosa_roja")).await.unwrap();
    session
        .edit_buffer_mut()
        .unwrap()
        .set_category_by_name("rosa_gallica_00_flor.jpg", ImageCategory::Fruit)
        .unwrap();

    let path = session.export_rename_script().await.unwrap().unwrap();

    assert_eq!(
        std::fs::read_to_string(path).unwrap(),
        r#"ren "rosa_gallica_00_flor.jpg" "rosa_gallica_00_fruit.jpg""#
    );
}

// ---------------------------------------------------------------------------
// Test: static hosting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn static_hosting_skips_saves_and_exports_by_download() {
    let (addr, origin) = spawn_origin().await;
    let downloads = tempfile::tempdir().unwrap();
    let config = config(
        &[
            ("HERBARI_ORIGIN", "https://herbari.github.io/editor/".to_string()),
            ("HERBARI_CATALOG", format!("http://{addr}/dades/plantes.json")),
            ("HERBARI_ASSETS", format!("http://{addr}/assets/imatges")),
        ],
        downloads.path(),
    );
    let mut session = EditorSession::new(config, Arc::new(UnsupportedPicker)).unwrap();
    assert_eq!(session.environment().mode, HostingMode::StaticPages);
    session.load_initial().await;

    assert_eq!(session.delete("no_such_plant").await.unwrap(), None);
    assert!(!session.is_dirty());

    let outcome = session.delete("rosa_roja").await.unwrap().unwrap();
    assert_matches!(outcome, SaveOutcome::Skipped { .. });
    assert!(session.is_dirty());
    assert!(origin.posted.lock().unwrap().is_empty());

    let export = session.export().await.unwrap();
    let path = assert_matches!(export, ExportOutcome::Downloaded { path } => path);
    assert!(path.starts_with(downloads.path()));
    assert!(parse_catalog(&std::fs::read(path).unwrap()).unwrap().is_empty());
    assert!(session.is_dirty());
}

// ---------------------------------------------------------------------------
// Test: file protocol with a held handle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn opened_file_receives_saves_until_closed() {
    let site = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let catalog_path = site.path().join("cataleg.json");
    std::fs::write(&catalog_path, serde_json::to_vec(&catalog_json()).unwrap()).unwrap();

    let config = config(
        &[("HERBARI_ORIGIN", format!("file://{}/index.html", site.path().display()))],
        downloads.path(),
    );
    let mut session = EditorSession::new(config, Arc::new(FixedPathPicker::new(&catalog_path))).unwrap();
    assert_eq!(session.environment().mode, HostingMode::FileProtocol);

    let initial = session.load_initial().await;
    assert_eq!(initial.level, NoticeLevel::Info);
    assert!(session.store().is_empty());

    session.open_with_handle().await.unwrap();
    assert!(session.holds_file());
    assert_eq!(session.source_name(), Some("cataleg.json"));
    assert_eq!(session.store().len(), 1);

    session.begin_edit(None).await.unwrap();
    let input = RecordInput {
        display_name: "Alzina".into(),
        scientific_name: "Quercus ilex".into(),
        ..Default::default()
    };
    let report = session.commit_edit(input, false).await.unwrap();
    assert_eq!(report.outcome, SaveOutcome::HeldFile { path: catalog_path.clone() });

    let on_disk = parse_catalog(&std::fs::read(&catalog_path).unwrap()).unwrap();
    let ids: Vec<_> = on_disk.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["rosa_roja", "alzina"]);

    session.close();
    assert!(!session.holds_file());
    assert_matches!(session.save().await.unwrap(), SaveOutcome::Skipped { .. });
}

#[tokio::test]
async fn discard_changes_reloads_the_opened_file() {
    let site = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let catalog_path = site.path().join("plantes.json");
    std::fs::write(&catalog_path, serde_json::to_vec(&catalog_json()).unwrap()).unwrap();

    let config = config(
        &[("HERBARI_ORIGIN", format!("file://{}/index.html", site.path().display()))],
        downloads.path(),
    );
    let mut session = EditorSession::new(config, Arc::new(FixedPathPicker::new(&catalog_path))).unwrap();
    session.open_with_handle().await.unwrap();

    session.import_bytes(b"[]").unwrap();
    assert!(session.store().is_empty());
    assert!(session.is_dirty());

    session.discard_changes().await.unwrap();
    assert_eq!(session.store().len(), 1);
    assert!(!session.is_dirty());
}

// ---------------------------------------------------------------------------
// Test: image discovery against a local asset directory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_image_never_takes_the_name_of_a_stored_one() {
    let site = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let assets = site.path().join("assets").join("imatges");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("rosa_gallica_00_fulla.jpg"), JPEG_HEADER).unwrap();

    let config = config(
        &[("HERBARI_ORIGIN", format!("file://{}/index.html", site.path().display()))],
        downloads.path(),
    );
    let mut session = EditorSession::new(config, Arc::new(UnsupportedPicker)).unwrap();
    session
        .import_bytes(&serde_json::to_vec(&catalog_json()).unwrap())
        .unwrap();

    session.begin_edit(Some("rosa_roja")).await.unwrap();
    let photo = downloads.path().join("nova_fulla.jpg");
    std::fs::write(&photo, JPEG_HEADER).unwrap();
    session.edit_buffer_mut().unwrap().attach_pending(&photo);
    session.refresh_images(None).await.unwrap();

    let edit = session.edit_session().unwrap();
    let mut names: Vec<_> = edit
        .buffer()
        .reconcile(edit.slug())
        .into_iter()
        .map(|image| image.file_name)
        .collect();
    names.sort();
    assert_eq!(names, ["rosa_gallica_00_fulla.jpg", "rosa_gallica_01_fulla.jpg"]);

    let original = edit.original().unwrap().clone();
    let report = session
        .commit_edit(RecordInput::from_record(&original), false)
        .await
        .unwrap();
    assert_eq!(report.uploads, [(photo, "rosa_gallica_01_fulla.jpg".to_string())]);

    let staged = session.stage_uploads(&report.uploads).await.unwrap();
    assert_eq!(staged, [downloads.path().join("rosa_gallica_01_fulla.jpg")]);
    assert_eq!(
        std::fs::read(assets.join("rosa_gallica_00_fulla.jpg")).unwrap(),
        JPEG_HEADER
    );
}

#[tokio::test]
async fn default_configuration_discovers_stored_images() {
    let assets = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("rosa_gallica_00_flor.jpg"), JPEG_HEADER).unwrap();

    let config = config(
        &[("HERBARI_ASSETS", assets.path().display().to_string())],
        downloads.path(),
    );
    let mut session = EditorSession::new(config, Arc::new(UnsupportedPicker)).unwrap();
    assert_eq!(session.environment().mode, HostingMode::Unknown);
    session
        .import_bytes(&serde_json::to_vec(&catalog_json()).unwrap())
        .unwrap();

    let discovery = session.begin_edit(Some("rosa_roja")).await.unwrap();
    assert_eq!(discovery.method, DiscoveryMethod::Listed);
    assert_eq!(discovery.found.len(), 1);

    let edit = session.edit_session().unwrap();
    assert_eq!(edit.buffer().summary().server_resident, 1);
    assert_eq!(
        edit.buffer().reconcile(edit.slug())[0].file_name,
        "rosa_gallica_00_flor.jpg"
    );
}

// ---------------------------------------------------------------------------
// Test: errors keep the session usable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_environment_refuses_native_open() {
    let downloads = tempfile::tempdir().unwrap();
    let config = config(&[], downloads.path());
    let mut session = EditorSession::new(config, Arc::new(UnsupportedPicker)).unwrap();

    assert_eq!(session.environment().mode, HostingMode::Unknown);
    assert_matches!(
        session.open_with_handle().await,
        Err(EditorError::NativeFilesUnavailable)
    );
}

#[tokio::test]
async fn bad_import_leaves_store_untouched() {
    let downloads = tempfile::tempdir().unwrap();
    let mut session = EditorSession::new(config(&[], downloads.path()), Arc::new(UnsupportedPicker)).unwrap();
    session
        .import_bytes(br#"[{"nom_comu": "Pi", "nom_cientific": "Pinus pinea"}]"#)
        .unwrap();

    assert_matches!(session.import_bytes(b"{\"items\": []}"), Err(EditorError::Format(_)));
    assert_matches!(session.import_bytes(b"no es json"), Err(EditorError::Format(_)));
    assert_eq!(session.store().len(), 1);
}

#[tokio::test]
async fn validation_failure_keeps_the_edit_open() {
    let downloads = tempfile::tempdir().unwrap();
    let mut session = EditorSession::new(config(&[], downloads.path()), Arc::new(UnsupportedPicker)).unwrap();
    session.begin_edit(None).await.unwrap();

    let result = session.commit_edit(RecordInput::default(), false).await;

    assert_matches!(result, Err(EditorError::Core(_)));
    assert!(session.edit_session().is_some());
    assert_matches!(
        session.commit_edit(RecordInput::default(), true).await,
        Ok(report) if report.outcome == SaveOutcome::Skipped { reason: herbari_persist::strategy::EXPORT_REQUIRED.into() }
    );
}
