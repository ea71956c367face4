use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::trace::testing::Recorder;

/// Accepts one connection, sends `greeting`, then answers each received
/// line with the next scripted response. Returns the received commands.
pub(crate) fn spawn_mock_server(
    greeting: &'static str,
    script: Vec<&'static str>,
) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        let mut received = Vec::new();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(&mut stream, greeting, script, &mut received);
        }
        received
    });
    ready_rx.recv().expect("server ready");
    (format!("127.0.0.1:{port}"), handle)
}

fn handle_session(
    stream: &mut TcpStream,
    greeting: &str,
    script: Vec<&'static str>,
    received: &mut Vec<String>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting.as_bytes())?;
    stream.flush()?;
    for response in script {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        received.push(line.trim_end().to_string());
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
    }
    Ok(())
}

const GREETING: &str = "220 mock.smtp.test ESMTP\r\n";
const EHLO_OK: &str = "250-mock.smtp.test\r\n250 8BITMIME\r\n";

fn sender() -> EmailAddress {
    EmailAddress::parse("postmaster@localhost").expect("sender")
}

fn recipient() -> EmailAddress {
    EmailAddress::parse("user@example.com").expect("recipient")
}

fn quick() -> ProbeOptions {
    ProbeOptions::default()
        .with_connect_timeout(Some(Duration::from_secs(2)))
        .with_command_timeout(Some(Duration::from_secs(5)))
}

#[test]
fn accepted_recipient_is_deliverable_and_session_is_reset() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "250 2.1.5 Ok\r\n",
            "250 2.0.0 Reset\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let outcome = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect("probe");
    assert_eq!(outcome.verdict, Verdict::Deliverable);
    assert!(outcome.is_deliverable());
    assert!(outcome.teardown.is_none(), "{:?}", outcome.teardown);
    assert_eq!(outcome.reply.code, 250);

    let commands = handle.join().expect("server thread");
    assert_eq!(
        commands,
        vec![
            "EHLO localhost",
            "MAIL FROM:<postmaster@localhost>",
            "RCPT TO:<user@example.com>",
            "RSET",
            "QUIT",
        ]
    );
    assert_eq!(
        outcome.transcript.last().map(SmtpEvent::stage),
        Some(Stage::Quit)
    );
}

#[test]
fn unknown_mailbox_is_not_deliverable() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "550 5.1.1 <user@example.com>: Recipient address rejected: User unknown\r\n",
            "250 2.0.0 Reset\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let outcome = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect("a rejection with 5.1.1 is a verdict");
    assert_eq!(outcome.verdict, Verdict::NotDeliverable);
    assert_eq!(outcome.reply.code, 550);

    let commands = handle.join().expect("server thread");
    assert_eq!(commands[3..], ["RSET", "QUIT"]);
}

#[test]
fn greylisted_unknown_mailbox_is_not_deliverable() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "451 4.1.1 Recipient address rejected: try again later\r\n",
            "250 2.0.0 Reset\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let outcome = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect("verdict");
    assert_eq!(outcome.verdict, Verdict::NotDeliverable);
    handle.join().expect("server thread");
}

#[test]
fn ambiguous_rejection_is_protocol_error() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "452 4.2.2 mailbox full\r\n",
            "250 2.0.0 Reset\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let err = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("mailbox full says nothing about existence");
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.stage(), Stage::RcptTo);
    assert_eq!(err.reply().map(|r| r.code), Some(452));

    let commands = handle.join().expect("server thread");
    assert_eq!(commands[3..], ["RSET", "QUIT"]);
}

#[test]
fn sender_rejection_is_protocol_error() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "553 5.7.1 Sender address rejected\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let err = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("MAIL FROM rejected");
    assert_eq!(err.stage(), Stage::MailFrom);
    assert_eq!(err.kind(), ErrorKind::Protocol);

    let commands = handle.join().expect("server thread");
    assert_eq!(
        commands,
        vec!["EHLO localhost", "MAIL FROM:<postmaster@localhost>", "QUIT"]
    );
}

#[test]
fn rejected_greeting_is_protocol_error() {
    let (endpoint, handle) = spawn_mock_server(
        "554 5.7.1 No SMTP service here\r\n",
        vec!["221 2.0.0 Bye\r\n"],
    );
    let err = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("greeting rejected");
    assert_eq!(err.stage(), Stage::Greeting);
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(handle.join().expect("server thread"), vec!["QUIT"]);
}

#[test]
fn falls_back_to_helo() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            "502 5.5.2 Command not recognized\r\n",
            "250 mock.smtp.test\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "221 Bye\r\n",
        ],
    );
    let options = ProbeOptions {
        helo_name: "probe.example.net".to_string(),
        ..quick()
    };
    let outcome = Prober::new(options)
        .probe(&endpoint, &sender(), &recipient())
        .expect("probe");
    assert!(outcome.is_deliverable());
    let commands = handle.join().expect("server thread");
    assert_eq!(commands[..2], ["EHLO probe.example.net", "HELO probe.example.net"]);
}

#[test]
fn teardown_failure_keeps_verdict() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "250 2.1.5 Ok\r\n",
            "500 5.5.1 RSET not today\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let outcome = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect("verdict survives teardown failure");
    assert_eq!(outcome.verdict, Verdict::Deliverable);
    let teardown = outcome.teardown.expect("RSET failure reported");
    assert_eq!(teardown.stage(), Stage::Reset);

    let commands = handle.join().expect("server thread");
    assert_eq!(commands[3..], ["RSET", "QUIT"]);
}

#[test]
fn dropped_connection_during_quit_keeps_verdict() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "550 5.1.1 User unknown\r\n",
            "250 2.0.0 Reset\r\n",
        ],
    );
    let outcome = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect("verdict");
    assert_eq!(outcome.verdict, Verdict::NotDeliverable);
    let teardown = outcome.teardown.expect("QUIT failure reported");
    assert_eq!(teardown.stage(), Stage::Quit);
    handle.join().expect("server thread");
}

#[test]
fn malformed_reply_is_protocol_error() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "hello there\r\n",
            "250 2.0.0 Reset\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let err = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("garbage reply");
    assert!(matches!(err, ProbeError::Malformed { stage: Stage::RcptTo, .. }), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Protocol);
    handle.join().expect("server thread");
}

#[test]
fn command_with_line_break_is_never_sent() {
    let (endpoint, handle) = spawn_mock_server(GREETING, vec!["221 2.0.0 Bye\r\n"]);
    let options = ProbeOptions {
        helo_name: "probe.example.net\r\nDATA".to_string(),
        ..quick()
    };
    let err = Prober::new(options)
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("refused before reaching the socket");
    assert!(matches!(err, ProbeError::Malformed { stage: Stage::Hello, .. }), "{err:?}");

    let commands = handle.join().expect("server thread");
    assert_eq!(commands, vec!["QUIT"]);
}

#[test]
fn overlong_reply_line_is_malformed() {
    let greeting: &'static str = format!("220 {}\r\n", "x".repeat(1024)).leak();
    let (endpoint, handle) = spawn_mock_server(greeting, vec!["221 Bye\r\n"]);
    let err = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("greeting too long");
    assert!(matches!(err, ProbeError::Malformed { stage: Stage::Greeting, .. }), "{err:?}");
    handle.join().expect("server thread");
}

#[test]
fn endless_multiline_reply_is_malformed() {
    let greeting: &'static str = format!("{}220 ready\r\n", "220-more\r\n".repeat(500)).leak();
    let (endpoint, handle) = spawn_mock_server(greeting, vec!["221 Bye\r\n"]);
    let err = Prober::new(quick())
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("too many lines");
    assert!(matches!(err, ProbeError::Malformed { stage: Stage::Greeting, .. }), "{err:?}");
    handle.join().expect("server thread");
}

#[test]
fn silent_server_times_out_when_exchange_is_bounded() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = listener.local_addr().expect("addr").to_string();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            let mut reader = BufReader::new(stream);
            let mut sink = String::new();
            let _ = reader.read_line(&mut sink);
        }
    });

    let bound = Duration::from_millis(300);
    let options = ProbeOptions::default()
        .with_connect_timeout(Some(Duration::from_secs(2)))
        .with_command_timeout(Some(bound));
    let started = Instant::now();
    let err = Prober::new(options)
        .probe(&endpoint, &sender(), &recipient())
        .expect_err("no greeting");
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(err.stage(), Stage::Greeting);
    assert!(elapsed < bound + Duration::from_secs(2), "took {elapsed:?}");
    handle.join().expect("server thread");
}

#[test]
fn refused_connection_is_not_a_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = listener.local_addr().expect("addr").to_string();
    drop(listener);

    let err = probe(&endpoint, &sender(), &recipient(), Some(Duration::from_secs(2)))
        .expect_err("nobody listens");
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!err.is_timeout());
}

#[test]
fn endpoint_without_port_is_connection_error() {
    let err = probe("mx.example.com", &sender(), &recipient(), None).expect_err("no port");
    assert!(matches!(err, ProbeError::Endpoint { .. }), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[test]
#[ignore = "requires a network that silently drops packets to 10.255.255.1"]
fn connect_timeout_is_bounded() {
    let timeout = Duration::from_secs(1);
    let started = Instant::now();
    let err = probe("10.255.255.1:25", &sender(), &recipient(), Some(timeout))
        .expect_err("unroutable");
    let elapsed = started.elapsed();
    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(err.stage(), Stage::Connect);
    assert!(elapsed <= timeout + Duration::from_millis(500), "took {elapsed:?}");
}

#[test]
fn trace_reports_each_step() {
    let (endpoint, handle) = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            "250 2.1.0 Ok\r\n",
            "250 2.1.5 Ok\r\n",
            "250 2.0.0 Reset\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    );
    let recorder = Arc::new(Recorder::default());
    Prober::new(quick())
        .with_trace(recorder.clone())
        .probe(&endpoint, &sender(), &recipient())
        .expect("probe");
    handle.join().expect("server thread");

    let steps = recorder.steps();
    for expected in [
        "Connected.",
        "MAIL FROM:<postmaster@localhost>",
        "RCPT TO:<user@example.com>",
        "user@example.com is deliverable",
        "RSET",
        "QUIT",
    ] {
        assert!(steps.iter().any(|s| s == expected), "missing {expected:?} in {steps:?}");
    }
    assert!(recorder.failures().is_empty());
}
