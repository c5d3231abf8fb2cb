//! End-to-end probe validation against a local protected application.
//!
//! These tests launch a real headless Chromium, so they are ignored by
//! default. Run them with `cargo test -p authkeep --test e2e -- --ignored`
//! on a machine with a Chromium-family browser installed.
//!
//! The stand-in application mimics the SSO shape the manager cares about:
//! `/dashboard` serves an authenticated page (with a `#user-menu` marker)
//! when the `sid=tok` cookie is present and bounces to `/login` otherwise.

use std::time::Duration;

use ak_protocol::{AuthSession, Cookie, ValidationOutcome};
use authkeep::validate::{ProbeValidator, Validate};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_protected_app() -> u16 {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();

	tokio::spawn(async move {
		loop {
			let Ok((socket, _)) = listener.accept().await else { break };
			tokio::spawn(handle(socket));
		}
	});

	port
}

async fn handle(mut socket: TcpStream) {
	let mut buf = vec![0u8; 4096];
	let mut request = String::new();
	loop {
		let Ok(n) = socket.read(&mut buf).await else { return };
		if n == 0 {
			return;
		}
		request.push_str(&String::from_utf8_lossy(&buf[..n]));
		if request.contains("\r\n\r\n") {
			break;
		}
	}

	let path = request.split_whitespace().nth(1).unwrap_or("/");
	let authenticated = request
		.lines()
		.find(|line| line.to_lowercase().starts_with("cookie:"))
		.is_some_and(|line| line.contains("sid=tok"));

	let response = if path.starts_with("/dashboard") {
		if authenticated {
			ok_html("<html><body><div id=\"user-menu\">uat user</div>Dashboard</body></html>")
		} else {
			"HTTP/1.1 302 Found\r\nLocation: /login?next=%2Fdashboard\r\nContent-Length: 0\r\n\r\n".to_string()
		}
	} else if path.starts_with("/login") {
		ok_html("<html><body><form id=\"login-form\"><input name=\"username\"></form></body></html>")
	} else {
		"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string()
	};

	let _ = socket.write_all(response.as_bytes()).await;
}

fn ok_html(body: &str) -> String {
	format!(
		"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
		body.len(),
		body
	)
}

fn validator_for(port: u16) -> ProbeValidator {
	ProbeValidator::new(
		format!("http://127.0.0.1:{port}/dashboard"),
		vec!["/login".to_string()],
		Some("#user-menu".to_string()),
		Duration::from_secs(15),
	)
}

fn session_with_cookie(port: u16, value: &str) -> AuthSession {
	let cookie = Cookie::new("sid", value, "127.0.0.1");
	AuthSession::new("uat", vec![cookie], Vec::new(), 1700000000)
		.with_source_url(format!("http://127.0.0.1:{port}/dashboard"))
}

#[tokio::test]
#[ignore = "requires a local Chromium-family browser"]
async fn valid_cookie_probes_ok() {
	let port = spawn_protected_app().await;
	let validator = validator_for(port);

	let report = validator.validate(&session_with_cookie(port, "tok")).await.unwrap();
	assert_eq!(report.outcome, ValidationOutcome::Ok, "observed {:?}", report.observed_url);
	assert!(report.observed_url.unwrap().contains("/dashboard"));
}

#[tokio::test]
#[ignore = "requires a local Chromium-family browser"]
async fn rejected_cookie_probes_redirected_to_login() {
	let port = spawn_protected_app().await;
	let validator = validator_for(port);

	let report = validator.validate(&session_with_cookie(port, "garbage")).await.unwrap();
	assert_eq!(report.outcome, ValidationOutcome::RedirectedToLogin);
	assert!(report.observed_url.unwrap().contains("/login"));
}

#[tokio::test]
#[ignore = "requires a local Chromium-family browser"]
async fn unreachable_environment_probes_network_unreachable() {
	// Nothing listens here; the probe browser still launches, but the
	// navigation fails, which must read as infrastructure, not staleness.
	let validator = ProbeValidator::new(
		"http://127.0.0.1:9/dashboard",
		vec!["/login".to_string()],
		None,
		Duration::from_secs(10),
	);

	let session = AuthSession::new("uat", vec![Cookie::new("sid", "tok", "127.0.0.1")], Vec::new(), 0);
	let report = validator.validate(&session).await.unwrap();
	assert_eq!(report.outcome, ValidationOutcome::NetworkUnreachable);
}
