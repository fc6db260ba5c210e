//! Purpose: End-to-end tests for the HTTP server and `RemoteClient`.
//! Exports: None (integration test module).
//! Role: Validate every endpoint and error propagation across TCP.
//! Invariants: Uses a loopback-only server on a freshly picked port.
//! Invariants: Server processes are cleaned up on drop.

use rpnstack::api::{ErrorKind, RemoteClient};
use std::collections::HashSet;
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

struct TestServer {
    child: Child,
    base_url: String,
}

impl TestServer {
    fn start() -> TestResult<Self> {
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");
            let base_url = format!("http://{bind}");

            let mut child = Command::new(env!("CARGO_BIN_EXE_rpnstack"))
                .arg("serve")
                .arg("--bind")
                .arg(&bind)
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()?;

            match wait_for_server(&mut child, bind.parse()?) {
                Ok(()) => return Ok(Self { child, base_url }),
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn client(&self) -> TestResult<RemoteClient> {
        Ok(RemoteClient::new(self.base_url.clone())?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Pushes random values until the stack's top-down contents start with `wanted`.
fn push_until(client: &RemoteClient, key: &str, wanted: &[i64]) -> TestResult<Vec<i64>> {
    for _ in 0..10_000 {
        client.clear(key)?;
        let mut contents = Vec::new();
        for _ in 0..wanted.len() {
            contents = client.push(key)?;
        }
        if contents == wanted {
            return Ok(contents);
        }
    }
    Err("random pushes never produced the wanted stack".into())
}

#[test]
fn operators_are_listed() -> TestResult<()> {
    let server = TestServer::start()?;
    let ops = server.client()?.list_operators()?;
    assert_eq!(ops, ["+", "-", "*", "/"]);
    Ok(())
}

#[test]
fn stack_lifecycle() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    let created = client.create_stack()?;
    assert!(created.values.is_empty());
    assert_eq!(created.location, format!("/stack/{}", created.key));
    assert_eq!(client.list_stacks()?, vec![created.key.clone()]);

    let after_push = client.push(&created.key)?;
    assert_eq!(after_push.len(), 1);
    assert!((1..=9).contains(&after_push[0]));
    let after_push = client.push(&created.key)?;
    assert_eq!(after_push.len(), 2);
    assert_eq!(client.get_stack(&created.key)?, after_push);

    assert!(client.clear(&created.key)?.is_empty());

    client.delete_stack(&created.key)?;
    assert!(client.list_stacks()?.is_empty());
    for err in [
        client.get_stack(&created.key).expect_err("get"),
        client.push(&created.key).expect_err("push"),
        client.delete_stack(&created.key).expect_err("delete"),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.stack(), Some(created.key.as_str()));
    }
    Ok(())
}

#[test]
fn created_keys_are_unique() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;
    let keys: HashSet<String> = (0..50)
        .map(|_| client.create_stack().map(|created| created.key))
        .collect::<Result<_, _>>()?;
    assert_eq!(keys.len(), 50);
    assert_eq!(client.list_stacks()?.len(), 50);
    Ok(())
}

#[test]
fn addition_replaces_top_two_with_sum() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;
    let key = client.create_stack()?.key;
    client.push(&key)?;
    client.push(&key)?;
    let before = client.push(&key)?;

    let after = client.apply("+", &key)?;
    assert_eq!(after.len(), before.len() - 1);
    assert_eq!(after[0], before[0] + before[1]);
    assert_eq!(after[1], before[2]);
    Ok(())
}

#[test]
fn subtraction_uses_first_pop_as_left_operand() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;
    let key = client.create_stack()?.key;
    push_until(&client, &key, &[5, 3])?;
    assert_eq!(client.apply("-", &key)?, vec![2]);
    Ok(())
}

#[test]
fn division_travels_percent_encoded() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;
    let key = client.create_stack()?.key;
    let before = push_until(&client, &key, &[8, 3])?;
    assert_eq!(before, vec![8, 3]);
    assert_eq!(client.apply("/", &key)?, vec![2]);
    Ok(())
}

#[test]
fn bad_operations_are_rejected() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;
    let key = client.create_stack()?.key;

    client.push(&key)?;
    let err = client.apply("*", &key).expect_err("one operand");
    assert_eq!(err.kind(), ErrorKind::InsufficientOperands);

    client.push(&key)?;
    let err = client.apply("%", &key).expect_err("unknown op");
    assert_eq!(err.kind(), ErrorKind::UnknownOperator);
    assert_eq!(err.op(), Some("%"));
    assert_eq!(client.get_stack(&key)?.len(), 2);

    let err = client.apply("+", "no-such-stack").expect_err("unknown stack");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn raw_http_status_codes() -> TestResult<()> {
    let server = TestServer::start()?;
    let base = &server.base_url;

    let created = ureq::post(&format!("{base}/stack")).call()?;
    assert_eq!(created.status(), 201);
    let location = created.header("Location").ok_or("missing location")?.to_string();
    assert_eq!(created.into_string()?, "[]");

    let got = ureq::get(&format!("{base}{location}")).call()?;
    assert_eq!(got.status(), 200);

    match ureq::post(&format!("{base}/op/+{location}")).call() {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 400),
        other => return Err(format!("expected 400, got {other:?}").into()),
    }

    let deleted = ureq::delete(&format!("{base}{location}")).call()?;
    assert_eq!(deleted.status(), 204);
    assert!(deleted.into_string()?.is_empty());

    match ureq::get(&format!("{base}{location}")).call() {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 404),
        other => return Err(format!("expected 404, got {other:?}").into()),
    }
    Ok(())
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let url = format!("http://{addr}/healthz");
    let start = Instant::now();
    loop {
        if let Ok(resp) = ureq::get(&url).call() {
            if resp.status() == 200 {
                return Ok(());
            }
        }
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            let detail = stderr.trim();
            return Err(format!(
                "server exited before ready (status: {status}, stderr: {})",
                if detail.is_empty() { "<empty>" } else { detail }
            )
            .into());
        }
        if start.elapsed() > Duration::from_secs(8) {
            return Err("server did not start in time".into());
        }
        sleep(Duration::from_millis(20));
    }
}
