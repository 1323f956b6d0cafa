mod common;

use common::{MockStream, Script, opts, sent_kinds};
use pretty_assertions::assert_eq;
use zero_mysqlx::constant::{ClientMessageType, SessionStateParam};
use zero_mysqlx::error::Error;
use zero_mysqlx::protocol::message::{AuthenticateOk, ErrorMsg};
use zero_mysqlx::sync::Session;
use zero_mysqlx::{AuthMechanism, Opts, SslMode};

fn tls_rejected() -> Script {
    Script::new().push(&ErrorMsg {
        severity: 2,
        code: 5001,
        sql_state: "HY000",
        msg: "Capability prepare failed for 'tls'",
    })
}

#[test]
fn preferred_tls_falls_back_to_plaintext() {
    let stream = MockStream::new(tls_rejected().login());
    let sent = std::rc::Rc::clone(&stream.sent);

    let session = Session::new_with_stream(stream, &opts(SslMode::Preferred)).unwrap();
    assert!(!session.is_tls());
    assert_eq!(session.auth_mechanism(), AuthMechanism::Mysql41);
    assert_eq!(session.client_id(), Some(7));
    assert_eq!(
        sent_kinds(&sent.borrow()),
        vec![
            ClientMessageType::CapabilitiesSet,
            ClientMessageType::AuthenticateStart,
            ClientMessageType::AuthenticateContinue,
        ]
    );
}

#[test]
fn required_tls_fails_when_server_rejects_it() {
    let stream = MockStream::new(tls_rejected());
    match Session::new_with_stream(stream, &opts(SslMode::Required)) {
        Err(Error::ServerError(err)) => assert_eq!(err.code, 5001),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("handshake succeeded without TLS"),
    }
}

#[test]
fn tls_upgrade_then_plain_auth() {
    let script = Script::new()
        .ok()
        .session_state(SessionStateParam::ClientIdAssigned, 9)
        .push(&AuthenticateOk { auth_data: b"" });
    // single-byte reads leave nothing buffered when the stream is upgraded
    let stream = MockStream::new(script).with_read_chunk(1).with_tls();
    let sent = std::rc::Rc::clone(&stream.sent);
    let opts = Opts {
        auth: None,
        ..opts(SslMode::Required)
    };

    let session = Session::new_with_stream(stream, &opts).unwrap();
    assert!(session.is_tls());
    assert!(session.with_stream(|stream| stream.tls).unwrap());
    assert_eq!(session.auth_mechanism(), AuthMechanism::Plain);
    assert_eq!(session.client_id(), Some(9));
    assert_eq!(
        sent_kinds(&sent.borrow()),
        vec![
            ClientMessageType::CapabilitiesSet,
            ClientMessageType::AuthenticateStart,
        ]
    );
}

#[test]
fn rejected_credentials() {
    let script = Script::new()
        .push(&zero_mysqlx::protocol::message::AuthenticateChallenge {
            auth_data: common::SALT,
        })
        .error(1045, "HY000", "Invalid user or password");
    let stream = MockStream::new(script);

    match Session::new_with_stream(stream, &opts(SslMode::Disabled)) {
        Err(Error::AuthFailed(err)) => assert_eq!(err.code, 1045),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("authenticated with a rejected password"),
    }
}
