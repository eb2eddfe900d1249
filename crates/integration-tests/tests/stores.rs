//! Store pages: listing, detail, the add/edit forms and ownership.

use axum::http::StatusCode;

use delicious_integration_tests::{MultipartForm, TestApp};

// ============================================================================
// Pages
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let resp = app.get("/health").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, "ok");

    let resp = app.get("/health/ready").await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_listing_renders() {
    let mut app = TestApp::new();

    for path in ["/", "/stores", "/tags", "/map"] {
        let resp = app.get(path).await;
        assert_eq!(resp.status, StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn test_unknown_pages_are_404() {
    let mut app = TestApp::new();

    let resp = app.get("/store/no-such-store").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body.contains("Not Found"));

    let resp = app.get("/nowhere").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // Not a valid slug at all
    let resp = app.get("/store/Bad%20Slug").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Creating
// ============================================================================

#[tokio::test]
async fn test_add_requires_login() {
    let mut app = TestApp::new();

    let resp = app.get("/add").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/login"));

    let resp = app
        .post_form("/add", MultipartForm::store("Cafe", "1 Main St", 0.0, 0.0))
        .await;
    assert_eq!(resp.location.as_deref(), Some("/login"));
    assert!(app.all_stores().await.is_empty());
}

#[tokio::test]
async fn test_create_store() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    let resp = app.get("/add").await;
    assert_eq!(resp.status, StatusCode::OK);

    let form = MultipartForm::store("Cafe Cuba", "12 Queen St W", -79.38, 43.65)
        .tag("Wifi")
        .tag("Open Late");
    let slug = app.create_store(form).await;
    assert_eq!(slug, "cafe-cuba");

    let store = app.store("cafe-cuba").await.expect("store saved");
    assert_eq!(store.author, wes.id);
    assert_eq!(store.tags, vec!["Wifi", "Open Late"]);
    assert!(store.photo.is_none());

    let page = app.get("/store/cafe-cuba").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Successfully created Cafe Cuba. Care to leave a review?"));
    assert!(page.body.contains("Added by Wes"));
    assert!(page.body.contains("/static/images/store.svg"));

    // Flashes are shown once
    let page = app.get("/store/cafe-cuba").await;
    assert!(!page.body.contains("Successfully created"));
}

#[tokio::test]
async fn test_duplicate_names_get_suffixed_slugs() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    let first = app
        .create_store(MultipartForm::store("Cafe", "1 Main St", 0.0, 0.0))
        .await;
    let second = app
        .create_store(MultipartForm::store("Cafe", "2 Main St", 0.0, 0.0))
        .await;
    let third = app
        .create_store(MultipartForm::store("Cafe", "3 Main St", 0.0, 0.0))
        .await;

    assert_eq!(first, "cafe");
    assert_eq!(second, "cafe-2");
    assert_eq!(third, "cafe-3");
}

#[tokio::test]
async fn test_rename_does_not_block_new_store() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    app.create_store(MultipartForm::store("Cafe", "1 Main St", 0.0, 0.0))
        .await;
    app.create_store(MultipartForm::store("Cafe", "2 Main St", 0.0, 0.0))
        .await;
    let first = app.store("cafe").await.expect("store saved");
    app.post_form(
        &format!("/add/{}", first.id),
        MultipartForm::store("Bistro", "1 Main St", 0.0, 0.0),
    )
    .await;
    assert!(app.store("bistro").await.is_some());

    let slug = app
        .create_store(MultipartForm::store("Cafe", "3 Main St", 0.0, 0.0))
        .await;
    assert_eq!(slug, "cafe-3");
}

#[tokio::test]
async fn test_invalid_store_is_flashed_back() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    let form = MultipartForm::new()
        .text("name", "  ")
        .text("location[address]", "")
        .text("location[coordinates][0]", "12")
        .text("location[coordinates][1]", "nope");
    let resp = app.post_form("/add", form).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/add"));
    assert!(app.all_stores().await.is_empty());

    let page = app.get("/add").await;
    assert!(page.body.contains("Please enter a store name!"));
    assert!(page.body.contains("You must supply an address!"));
}

#[tokio::test]
async fn test_store_without_location_is_allowed() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    let slug = app
        .create_store(MultipartForm::new().text("name", "Pop-up Stand"))
        .await;
    let store = app.store(&slug).await.expect("store saved");
    assert!(store.location.is_none());
}

// ============================================================================
// Editing
// ============================================================================

#[tokio::test]
async fn test_author_can_update() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    let slug = app
        .create_store(MultipartForm::store("Cafe", "1 Main St", 0.0, 0.0))
        .await;
    let store = app.store(&slug).await.expect("store saved");

    let edit = app.get(&format!("/stores/{}/edit", store.id)).await;
    assert_eq!(edit.status, StatusCode::OK);
    assert!(edit.body.contains("1 Main St"));

    let resp = app
        .post_form(
            &format!("/add/{}", store.id),
            MultipartForm::store("Cafe Royale", "1 Main St", 0.0, 0.0).tag("Licensed"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(
        resp.location,
        Some(format!("/stores/{}/edit", store.id))
    );

    assert!(app.store("cafe").await.is_none());
    let updated = app.store("cafe-royale").await.expect("renamed");
    assert_eq!(updated.id, store.id);
    assert_eq!(updated.tags, vec!["Licensed"]);

    let edit = app.get(&format!("/stores/{}/edit", store.id)).await;
    assert!(edit.body.contains("Successfully updated Cafe Royale."));
}

#[tokio::test]
async fn test_update_keeps_slug_when_name_unchanged() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    app.create_store(MultipartForm::store("Cafe", "1 Main St", 0.0, 0.0))
        .await;
    let slug = app
        .create_store(MultipartForm::store("Cafe", "2 Main St", 0.0, 0.0))
        .await;
    assert_eq!(slug, "cafe-2");
    let store = app.store(&slug).await.expect("store saved");

    app.post_form(
        &format!("/add/{}", store.id),
        MultipartForm::store("Cafe", "3 Main St", 0.0, 0.0),
    )
    .await;

    let updated = app.store("cafe-2").await.expect("slug kept");
    assert_eq!(updated.location.expect("location").address, "3 Main St");
}

#[tokio::test]
async fn test_non_author_cannot_edit() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    let debbie = app.create_user("debbie@example.com", "Debbie").await;

    app.login(&wes).await;
    let slug = app
        .create_store(MultipartForm::store("Cafe", "1 Main St", 0.0, 0.0))
        .await;
    let store = app.store(&slug).await.expect("store saved");

    app.logout();
    app.login(&debbie).await;

    let resp = app.get(&format!("/stores/{}/edit", store.id)).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/stores"));

    let resp = app
        .post_form(
            &format!("/add/{}", store.id),
            MultipartForm::store("Hijacked", "1 Main St", 0.0, 0.0),
        )
        .await;
    assert_eq!(resp.location.as_deref(), Some("/stores"));

    let page = app.get("/stores").await;
    assert!(page.body.contains("You must own the store in order to edit it!"));

    let unchanged = app.store("cafe").await.expect("still there");
    assert_eq!(unchanged.name, "Cafe");
}

#[tokio::test]
async fn test_edit_unknown_store_is_404() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    let resp = app.get("/stores/not-an-id/edit").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .get("/stores/00000000-0000-4000-8000-000000000000/edit")
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn test_tag_browser() {
    let mut app = TestApp::new();
    let wes = app.create_user("wes@example.com", "Wes").await;
    app.login(&wes).await;

    app.create_store(MultipartForm::store("Wired", "1 Main St", 0.0, 0.0).tag("Wifi"))
        .await;
    app.create_store(
        MultipartForm::store("Late Night", "2 Main St", 0.0, 0.0)
            .tag("Wifi")
            .tag("Open Late"),
    )
    .await;
    app.create_store(MultipartForm::store("Plain", "3 Main St", 0.0, 0.0))
        .await;

    let all = app.get("/tags").await;
    assert_eq!(all.status, StatusCode::OK);
    assert!(all.body.contains("Wired"));
    assert!(all.body.contains("Late Night"));
    // Untagged stores are not listed under any tag
    assert!(!all.body.contains("Plain"));

    let late = app.get("/tags/Open%20Late").await;
    assert_eq!(late.status, StatusCode::OK);
    assert!(late.body.contains("Late Night"));
    assert!(!late.body.contains("Wired"));
    assert!(late.body.contains("tag__link--active"));

    let unknown = app.get("/tags/Nothing").await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert!(!unknown.body.contains("Wired"));
}
