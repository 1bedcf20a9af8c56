mod common;

use common::{
    identified_script, ready_session, ready_session_with, test_config, MockTransport,
    RecordingListener,
};
use marlinkit_communication::{CommandEncoder, Session};
use marlinkit_core::{Error, ProtocolError, SessionState};
use marlinkit_settings::CommandTable;
use std::sync::Arc;

fn encoder() -> CommandEncoder {
    CommandEncoder::new(CommandTable::default())
}

#[test]
fn test_connect_and_identify() {
    let transport = identified_script();
    let sent = transport.sent_log();

    let mut session = Session::connect(Box::new(transport), Arc::new(test_config())).unwrap();
    assert_eq!(session.session_state(), SessionState::Identifying);

    let info = session.identify().unwrap();
    assert_eq!(session.session_state(), SessionState::Ready);
    assert_eq!(info.firmware_version.as_deref(), Some("2.1.2"));
    assert_eq!(info.machine_type.as_deref(), Some("Ender-3"));
    assert_eq!(session.device_info().unwrap().extruder_count, Some(1));

    // The identify request itself ends with the sentinel
    assert_eq!(*sent.lock().unwrap(), ["M115", "M84"]);
}

#[test]
fn test_identify_timeout_fails_session() {
    let transport = MockTransport::new();
    let mut session = Session::connect(Box::new(transport), Arc::new(test_config())).unwrap();

    let err = session.identify().unwrap_err();
    assert!(err.is_timeout());
    assert!(!err.is_recoverable());
    assert_eq!(session.session_state(), SessionState::Failed);

    // A failed session refuses further commands
    let err = session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::NotReady {
            state: SessionState::Failed
        })
    ));
}

#[test]
fn test_command_cycle_applies_effect_after_ack() {
    let (mut session, sent) = ready_session(identified_script().respond("ok"));

    session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap();

    assert_eq!(*sent.lock().unwrap(), ["G0 F1500", "M84"]);
    assert_eq!(session.machine_state().feed_rate, 1500.0);
    assert_eq!(session.session_state(), SessionState::Ready);
}

#[test]
fn test_ack_timeout_leaves_session_ready_for_retry() {
    // Silence outlasting the first wait, then a late acknowledgment
    let (mut session, _sent) = ready_session(identified_script().silence(120).respond("ok"));

    let err = session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap_err();
    assert!(err.is_timeout());
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::AckTimeout { ref command, .. }) if command == "G0 F1500"
    ));

    // The effect was not applied
    assert_eq!(session.machine_state().feed_rate, 5000.0);
    assert_eq!(session.session_state(), SessionState::Ready);

    // The same command can be retried on the still-open session
    session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap();
    assert_eq!(session.machine_state().feed_rate, 1500.0);
}

#[test]
fn test_noise_lines_are_discarded_until_the_ack() {
    let (mut session, sent) = ready_session(
        identified_script()
            .respond("echo:busy: processing")
            .respond("T:24.3 /0.0 B:24.1 /0.0")
            .respond("echo:busy: processing")
            .respond("ok"),
    );

    session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap();
    assert_eq!(session.machine_state().feed_rate, 1500.0);
    assert_eq!(*sent.lock().unwrap(), ["G0 F1500", "M84"]);
}

#[test]
fn test_noise_bound_degrades_into_timeout() {
    let mut config = test_config();
    config.protocol.max_unrecognized_lines = 2;

    let (mut session, _sent) = ready_session_with(
        identified_script()
            .respond("echo:one")
            .respond("echo:two")
            .respond("echo:three")
            .respond("ok"),
        config,
    );

    let err = session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(session.session_state(), SessionState::Ready);
    assert_eq!(session.machine_state().feed_rate, 5000.0);
}

#[test]
fn test_blank_lines_are_not_noise() {
    let mut config = test_config();
    config.protocol.max_unrecognized_lines = 0;

    let (mut session, _sent) = ready_session_with(
        identified_script().respond("").respond("   ").respond("ok"),
        config,
    );

    session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap();
    assert_eq!(session.machine_state().feed_rate, 1500.0);
}

#[test]
fn test_write_failure_fails_the_session() {
    // The identify request takes two writes; the next write breaks
    let transport = identified_script().fail_writes_after(2);
    let (mut session, _sent) = ready_session(transport);

    let err = session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
    assert!(!err.is_recoverable());
    assert_eq!(session.session_state(), SessionState::Failed);
}

#[test]
fn test_close_is_idempotent_and_blocks_commands() {
    let (mut session, _sent) = ready_session(identified_script());

    session.close().unwrap();
    assert_eq!(session.session_state(), SessionState::Closed);
    session.close().unwrap();

    let err = session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::NotReady {
            state: SessionState::Closed
        })
    ));
}

#[test]
fn test_multi_line_command_has_one_sentinel_and_one_ack() {
    let (mut session, sent) = ready_session(identified_script().respond("ok"));

    let command = encoder()
        .relative_move(&marlinkit_core::AxisValues::z(5.0), Some(600.0))
        .unwrap();
    session.execute(command).unwrap();

    assert_eq!(
        *sent.lock().unwrap(),
        ["G91", "G0 Z5 F600", "G90", "M84"]
    );
    assert_eq!(session.session_state(), SessionState::Ready);
}

#[test]
fn test_unacknowledged_command_skips_the_wait() {
    // No scripted response at all
    let (mut session, sent) = ready_session(identified_script());

    session.execute(encoder().emergency_stop()).unwrap();
    assert_eq!(*sent.lock().unwrap(), ["M112", "M84"]);
    assert_eq!(session.session_state(), SessionState::Ready);
}

#[test]
fn test_listener_observes_the_command_cycle() {
    let (mut session, _sent) = ready_session(identified_script().respond("echo:hi").respond("ok"));

    let listener = Arc::new(RecordingListener::default());
    let handle = session.register_listener(listener.clone());

    session.execute(encoder().feed_rate(1500.0).unwrap()).unwrap();

    let changes = listener.state_changes.lock().unwrap().clone();
    assert_eq!(
        changes,
        [
            (SessionState::Ready, SessionState::Sending),
            (SessionState::Sending, SessionState::AwaitingAck),
            (SessionState::AwaitingAck, SessionState::Ready),
        ]
    );
    assert_eq!(*listener.sent.lock().unwrap(), ["G0 F1500", "M84"]);
    assert_eq!(*listener.received.lock().unwrap(), ["echo:hi", "ok"]);
    assert_eq!(*listener.noise.lock().unwrap(), ["echo:hi"]);

    assert!(session.unregister_listener(&handle));
    assert!(!session.unregister_listener(&handle));
}
