use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use webqa_source::{SourceConfig, SourceError, TextCleaner, WebsiteLoader};

const PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Harbour Museum</title><style>.x { display: none }</style></head>
  <body>
    <nav>Home | Login | Register</nav>
    <main>
      <p>The Harbour Museum is open every day from nine in the morning until five in the evening.</p>
      <p>Admission is free for children under twelve and for members of the friends association.</p>
      <p>Guided tours of the old lighthouse start at eleven and take about forty five minutes.</p>
      <p>The cafe on the ground floor serves coffee, cakes and light lunches throughout the day.</p>
      <script>trackVisitor("secret-token")</script>
    </main>
    <footer>Copyright 2024 Harbour Museum. All rights reserved.</footer>
  </body>
</html>"#;

async fn serve() -> String {
    let router = Router::new()
        .route("/museum", get(|| async { Html(PAGE) }))
        .route("/empty", get(|| async { Html("<html><body><p>Hi</p></body></html>") }))
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn loader() -> WebsiteLoader {
    WebsiteLoader::new(SourceConfig {
        timeout_secs: 5,
        ..SourceConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn fetches_title_and_visible_text() {
    let base = serve().await;
    let doc = loader().fetch(&format!("{base}/museum")).await.unwrap();

    assert_eq!(doc.title, "Harbour Museum");
    assert!(doc.raw_text.contains("open every day from nine"));
    assert!(!doc.raw_text.contains("secret-token"));
    assert!(!doc.raw_text.contains("display: none"));

    let cleaned = TextCleaner::new(Default::default())
        .unwrap()
        .clean(&doc.raw_text)
        .unwrap();
    assert!(cleaned.contains("Guided tours of the old lighthouse"));
    assert!(!cleaned.to_lowercase().contains("rights reserved"));
    assert!(!cleaned.contains("Login"));
}

#[tokio::test]
async fn document_keeps_the_url_as_given() {
    let base = serve().await;
    // Parsing would lower-case the scheme; the stored source must not change.
    let given = base.replacen("http://", "HTTP://", 1) + "/museum";
    let doc = loader().fetch(&given).await.unwrap();
    assert_eq!(doc.url, given);
}

#[tokio::test]
async fn non_200_is_bad_response() {
    let base = serve().await;
    let err = loader().fetch(&format!("{base}/missing")).await.unwrap_err();
    assert!(matches!(err, SourceError::BadResponse { status: 404 }), "{err}");
}

#[tokio::test]
async fn tiny_page_is_empty_content() {
    let base = serve().await;
    let err = loader().fetch(&format!("{base}/empty")).await.unwrap_err();
    assert!(matches!(err, SourceError::EmptyContent(_)), "{err}");
}

#[tokio::test]
async fn unreachable_host_is_retryable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = loader().fetch(&format!("http://{addr}/")).await.unwrap_err();
    assert!(matches!(err, SourceError::Unreachable(_)), "{err}");
    assert!(err.to_string().contains("connection failed"), "{err}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_url_is_invalid_input() {
    let err = loader().fetch("www.example.com").await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidInput(_)), "{err}");
}
