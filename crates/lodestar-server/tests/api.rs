//! Routes end to end against an in-memory site

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, header};
use lodestar_auth::ContextUpdate;
use lodestar_conf::Settings;
use lodestar_db::{DatabaseConnection, MigrationExecutor};
use lodestar_pages::NewPage;
use lodestar_server::{
	AppState, DEFAULT_MAX_BODY_SIZE, Handler, HttpServer, Request, Response, Router, USER_HEADER,
	build_router,
};
use rstest::*;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

struct Site {
	router: Router,
	state: Arc<AppState>,
	admin: i64,
	writer: i64,
	reader: i64,
	author: i64,
}

/// admin (superuser), writer (in the Writers group, which may `create`
/// under `/blog`) and reader (no rights); writer owns the author Ada
#[fixture]
async fn site() -> Site {
	let db = DatabaseConnection::connect("sqlite::memory:", 1)
		.await
		.unwrap();
	MigrationExecutor::new(db.clone()).apply_all().await.unwrap();
	let state = Arc::new(AppState::new(db, &Settings::default(), None));

	let accounts = state.checker.accounts();
	let admin = accounts.create_user("admin", None, true).await.unwrap().id;
	let writer = accounts.create_user("writer", None, false).await.unwrap().id;
	let reader = accounts.create_user("reader", None, false).await.unwrap().id;
	let writers = accounts.create_group("Writers", None, false).await.unwrap().id;
	accounts.add_user_to_group(writer, writers).await.unwrap();

	let permissions = state.checker.permissions();
	permissions.create_action("admin", "create").await.unwrap();
	permissions.create_action("admin", "publish").await.unwrap();
	permissions.create_context("admin", "/blog").await.unwrap();
	let context = permissions.get_contexts("admin").await.unwrap()[0].id;
	let update = ContextUpdate {
		locator: "/blog".to_string(),
		group_perms: BTreeMap::from([(
			writers,
			BTreeMap::from([("create".to_string(), true), ("publish".to_string(), false)]),
		)]),
		user_perms: BTreeMap::new(),
	};
	permissions.save_context("admin", context, &update).await.unwrap();

	let author = state
		.blog
		.create_author("Ada", "", Some(writer))
		.await
		.unwrap()
		.id;

	Site {
		router: build_router(state.clone()),
		state,
		admin,
		writer,
		reader,
		author,
	}
}

fn request(method: Method, uri: &str, user: Option<i64>, body: Option<Value>) -> Request {
	let mut request = Request::new(method, uri.parse().unwrap(), HeaderMap::new(), Bytes::new());
	if let Some(user) = user {
		request = request.with_header(USER_HEADER, &user.to_string());
	}
	if let Some(body) = body {
		request = request.with_body(body.to_string());
	}
	request
}

async fn send(router: &Router, request: Request) -> Response {
	router
		.handle(request)
		.await
		.unwrap_or_else(|e| e.into_response())
}

fn json_body(response: &Response) -> Value {
	serde_json::from_slice(&response.body).unwrap()
}

#[rstest]
#[tokio::test]
async fn test_post_creation_requires_permission_and_ownership(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let post = json!({"author": site.author, "title": "Hello", "body": "<p>hi</p>"});

	// Act
	let guest = send(&site.router, request(Method::POST, "/api/blog/posts", None, Some(post.clone()))).await;
	let reader = send(&site.router, request(Method::POST, "/api/blog/posts", Some(site.reader), Some(post.clone()))).await;
	let foreign_author = site.state.blog.create_author("Grace", "", Some(site.admin)).await.unwrap();
	let impersonation = send(
		&site.router,
		request(
			Method::POST,
			"/api/blog/posts",
			Some(site.writer),
			Some(json!({"author": foreign_author.id, "body": ""})),
		),
	)
	.await;

	// Assert
	assert_eq!(guest.status, StatusCode::FORBIDDEN);
	assert_eq!(reader.status, StatusCode::FORBIDDEN);
	assert_eq!(impersonation.status, StatusCode::FORBIDDEN);
	assert_eq!(json_body(&reader)["error"], "Forbidden: may not create blog posts");
}

#[rstest]
#[tokio::test]
async fn test_publish_without_right_saves_draft(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let post = json!({"author": site.author, "title": "Hello", "body": "<p>hi</p>", "publish": true});

	// Act
	let created = send(&site.router, request(Method::POST, "/api/blog/posts", Some(site.writer), Some(post))).await;
	let post_id = json_body(&created)["id"].as_i64().unwrap();
	let uri = format!("/api/blog/posts/{post_id}");

	// Assert
	assert_eq!(created.status, StatusCode::CREATED);
	assert_eq!(json_body(&created)["status"], false);

	let anonymous = send(&site.router, request(Method::GET, "/api/blog/posts", None, None)).await;
	assert_eq!(json_body(&anonymous), json!([]));
	let own = send(&site.router, request(Method::GET, "/api/blog/posts", Some(site.writer), None)).await;
	assert_eq!(json_body(&own).as_array().unwrap().len(), 1);
	let everything = send(&site.router, request(Method::GET, "/api/blog/posts?limit=5", Some(site.admin), None)).await;
	assert_eq!(json_body(&everything).as_array().unwrap().len(), 1);

	let hidden = send(&site.router, request(Method::GET, &uri, Some(site.reader), None)).await;
	assert_eq!(hidden.status, StatusCode::NOT_FOUND);
	let detail = send(&site.router, request(Method::GET, &uri, Some(site.writer), None)).await;
	assert_eq!(detail.status, StatusCode::OK);
	assert_eq!(json_body(&detail)["latest"]["body"], "<p>hi</p>");
}

#[rstest]
#[tokio::test]
async fn test_tags(#[future] site: Site) {
	let site = site.await;

	let created = send(
		&site.router,
		request(Method::POST, "/api/blog/tags", Some(site.writer), Some(json!({"name": "Rust"}))),
	)
	.await;
	let denied = send(
		&site.router,
		request(Method::POST, "/api/blog/tags", Some(site.reader), Some(json!({"name": "Go"}))),
	)
	.await;
	let listed = send(&site.router, request(Method::GET, "/api/blog/tags?sort=name&desc=true", None, None)).await;

	assert_eq!(created.status, StatusCode::CREATED);
	assert_eq!(json_body(&created)["slug"], "rust");
	assert_eq!(denied.status, StatusCode::FORBIDDEN);
	assert_eq!(json_body(&listed).as_array().unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_permission_admin_is_superuser_only(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let admin = Some(site.admin);

	// Act
	let forbidden = send(&site.router, request(Method::GET, "/api/permissions/admin/actions", Some(site.writer), None)).await;
	let actions = send(&site.router, request(Method::GET, "/api/permissions/admin/actions", admin, None)).await;
	let duplicate = send(
		&site.router,
		request(Method::POST, "/api/permissions/admin/actions", admin, Some(json!({"label": "create"}))),
	)
	.await;
	let added = send(
		&site.router,
		request(Method::POST, "/api/permissions/admin/actions", admin, Some(json!({"label": "delete"}))),
	)
	.await;
	let unknown_realm = send(&site.router, request(Method::GET, "/api/permissions/nowhere/actions", admin, None)).await;

	// Assert
	assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
	assert_eq!(json_body(&actions).as_array().unwrap().len(), 2);
	assert_eq!(duplicate.status, StatusCode::CONFLICT);
	assert_eq!(added.status, StatusCode::CREATED);
	assert_eq!(unknown_realm.status, StatusCode::NOT_FOUND);

	let delete_id = site
		.state
		.checker
		.permissions()
		.get_actions("admin")
		.await
		.unwrap()
		.into_iter()
		.find(|a| a.label == "delete")
		.unwrap()
		.id;
	let renamed = send(
		&site.router,
		request(
			Method::PUT,
			&format!("/api/permissions/admin/actions/{delete_id}"),
			admin,
			Some(json!({"label": "remove"})),
		),
	)
	.await;
	assert_eq!(json_body(&renamed)["label"], "remove");
}

#[rstest]
#[tokio::test]
async fn test_context_editing_and_checks(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let admin = Some(site.admin);
	let context = site.state.checker.permissions().get_contexts("admin").await.unwrap()[0].id;
	let uri = format!("/api/permissions/admin/contexts/{context}");
	let check = |user: i64| format!("/api/permissions/admin/check?action=create&uri=%2Fblog%2Fnew&user={user}");

	// Act
	let detail = send(&site.router, request(Method::GET, &uri, admin, None)).await;
	let before = send(&site.router, request(Method::GET, &check(site.reader), None, None)).await;
	let update = json!({
		"locator": "/blog",
		"group_perms": {},
		"user_perms": {site.reader.to_string(): {"create": true}},
	});
	let saved = send(&site.router, request(Method::PUT, &uri, admin, Some(update))).await;
	let after = send(&site.router, request(Method::GET, &check(site.reader), None, None)).await;
	let writer_after = send(&site.router, request(Method::GET, &check(site.writer), None, None)).await;

	// Assert
	let detail = json_body(&detail);
	assert_eq!(detail["context"]["locator"], "/blog");
	assert_eq!(detail["groups"][0]["name"], "Writers");
	assert_eq!(detail["groups"][0]["perms"]["create"], true);
	assert_eq!(detail["groups"][0]["perms"]["publish"], false);
	assert_eq!(detail["users"], json!({}));
	assert_eq!(json_body(&before)["allowed"], false);
	assert_eq!(saved.status, StatusCode::OK);
	assert_eq!(json_body(&after)["allowed"], true);
	assert_eq!(json_body(&writer_after)["allowed"], false);

	let anonymous = send(
		&site.router,
		request(Method::GET, "/api/permissions/admin/check?action=create&uri=/blog", None, None),
	)
	.await;
	assert_eq!(json_body(&anonymous)["allowed"], false);
}

#[rstest]
#[tokio::test]
async fn test_public_pages_and_redirects(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let pages = &site.state.pages;
	pages.create_dir("public", "", "docs").await.unwrap();
	let install = NewPage {
		url: "install".to_string(),
		cache: false,
		formatting: "Markdown".to_string(),
		metadata: json!({}),
		body: "# Install".to_string(),
	};
	pages
		.create_page("public", "docs", &install, true, false, Some(site.admin))
		.await
		.unwrap();
	pages
		.create_same_realm_redirect("setup", "docs/install", "public")
		.await
		.unwrap();

	// Act
	let page = send(&site.router, request(Method::GET, "/docs/install", None, None)).await;
	let moved = send(&site.router, request(Method::GET, "/setup", None, None)).await;
	let missing = send(&site.router, request(Method::GET, "/nothing/here", None, None)).await;
	let wrong_method = send(&site.router, request(Method::POST, "/docs/install", None, None)).await;
	let tree = send(&site.router, request(Method::GET, "/api/pages/public/tree", Some(site.admin), None)).await;

	// Assert
	assert_eq!(page.status, StatusCode::OK);
	assert!(String::from_utf8_lossy(&page.body).contains("Install</h1>"));
	assert_eq!(page.headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
	assert_eq!(moved.status, StatusCode::MOVED_PERMANENTLY);
	assert_eq!(moved.headers[header::LOCATION], "/docs/install");
	assert_eq!(missing.status, StatusCode::NOT_FOUND);
	assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(json_body(&tree)[0]["url"], "docs");
}

#[rstest]
#[tokio::test]
async fn test_unsendable_redirect_target_is_not_found(#[future] site: Site) {
	// Arrange
	let site = site.await;
	site.state
		.pages
		.create_same_realm_redirect("broken", "docs/bad\nSet-Cookie: x=1", "public")
		.await
		.unwrap();

	// Act
	let response = send(&site.router, request(Method::GET, "/broken", None, None)).await;

	// Assert
	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert!(!response.headers.contains_key(header::LOCATION));
}

/// Serve `router` on an ephemeral port, send one raw request and return the
/// raw response once the server closes the connection
async fn exchange(router: Router, max_body_size: usize, raw_request: &[u8]) -> String {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
	let server = HttpServer::new(Arc::new(router)).with_max_body_size(max_body_size);
	let client = async move {
		let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
		stream.write_all(raw_request).await.unwrap();
		let mut raw = Vec::new();
		stream.read_to_end(&mut raw).await.unwrap();
		stop.send(()).unwrap();
		raw
	};

	let (served, raw) = tokio::join!(
		server.serve(listener, async {
			let _ = stopped.await;
		}),
		client
	);
	served.unwrap();
	String::from_utf8_lossy(&raw).into_owned()
}

#[rstest]
#[tokio::test]
async fn test_server_answers_over_tcp(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let request = b"GET /api/blog/posts HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";

	// Act
	let text = exchange(site.router, DEFAULT_MAX_BODY_SIZE, request).await;

	// Assert
	assert!(text.starts_with("HTTP/1.1 200 OK"));
	assert!(text.ends_with("[]"));
}

#[rstest]
#[tokio::test]
async fn test_declared_oversized_body_is_refused(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let request = b"POST /api/blog/tags HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 1048576\r\nConnection: close\r\n\r\n";

	// Act
	let text = exchange(site.router, 1024, request).await;

	// Assert
	assert!(text.starts_with("HTTP/1.1 413 Payload Too Large"));
	assert!(text.contains("Request body exceeds 1024 bytes"));
}

#[rstest]
#[tokio::test]
async fn test_streamed_oversized_body_is_refused(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let chunk = "x".repeat(64);
	let request = format!(
		"POST /api/blog/tags HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n40\r\n{chunk}\r\n0\r\n\r\n"
	);

	// Act
	let text = exchange(site.router, 16, request.as_bytes()).await;

	// Assert
	assert!(text.starts_with("HTTP/1.1 413 Payload Too Large"));
}

#[rstest]
#[tokio::test]
async fn test_body_within_limit_reaches_views(#[future] site: Site) {
	// Arrange
	let site = site.await;
	let body = r#"{"name":"Rust"}"#;
	let request = format!(
		"POST /api/blog/tags HTTP/1.1\r\nHost: localhost\r\nX-User-Id: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
		site.writer,
		body.len()
	);

	// Act
	let text = exchange(site.router, 1024, request.as_bytes()).await;

	// Assert
	assert!(text.starts_with("HTTP/1.1 201 Created"));
	assert!(text.contains(r#""slug":"rust""#));
}
