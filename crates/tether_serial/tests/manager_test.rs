//! Bring-up, dispatch and teardown of the serial manager over the loopback
//! driver.

use crossbeam_channel::{unbounded, Receiver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tether_core::{BridgeError, BridgeResult};
use tether_serial::{
    Discovery, HardwareInterface, LoopbackInterface, MessageListener, SerialConfig, SerialEvent,
    SerialManager, StatusListener,
};

const DEADLINE: Duration = Duration::from_secs(5);

fn discover(loopback: fn() -> LoopbackInterface) -> Discovery {
    Box::new(move || Some(Box::new(loopback()) as Box<dyn HardwareInterface>))
}

fn manager() -> SerialManager {
    SerialManager::new(SerialConfig::default(), LoopbackInterface::discovery()).unwrap()
}

fn message_channel(manager: &SerialManager) -> Receiver<String> {
    let (tx, rx) = unbounded();
    manager.add_message_listener(Arc::new(move |msg: &str| -> BridgeResult<()> {
        let _ = tx.send(msg.to_string());
        Ok(())
    }));
    rx
}

fn status_channel(manager: &SerialManager) -> Receiver<SerialEvent> {
    let (tx, rx) = unbounded();
    manager.add_status_listener(Arc::new(move |event: SerialEvent| -> BridgeResult<()> {
        let _ = tx.send(event);
        Ok(())
    }));
    rx
}

#[test]
fn test_echo_reaches_message_listener() {
    let mut m = manager();
    let messages = message_channel(&m);

    m.begin("loop0", 9600).unwrap();
    m.print("PING").unwrap();
    assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), "PING");

    m.send(&[0x50, 0x4F, 0x4E, 0x47]).unwrap();
    assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), "PONG");

    m.end().unwrap();
    assert!(!m.is_enabled());
}

#[test]
fn test_invalid_utf8_decoded_lossily() {
    let mut m = manager();
    let messages = message_channel(&m);

    m.begin("loop0", 9600).unwrap();
    m.send(&[b'O', 0xFF, b'K']).unwrap();
    assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), "O\u{FFFD}K");
    m.end().unwrap();
}

#[test]
fn test_engine_state_follows_status() {
    let mut m = manager();
    let statuses = status_channel(&m);
    assert!(!m.is_engine_on());

    m.begin("loop0", 9600).unwrap();
    assert_eq!(statuses.recv_timeout(DEADLINE).unwrap(), SerialEvent::Started);
    assert!(m.is_engine_on());

    m.end().unwrap();
    assert_eq!(statuses.try_recv(), Ok(SerialEvent::Stopped));
    assert!(!m.is_engine_on());
}

#[test]
fn test_end_delivers_stop_behind_slow_listener() {
    let mut m = manager();
    let statuses = status_channel(&m);
    let (entered_tx, entered_rx) = unbounded();
    m.add_message_listener(Arc::new(move |_msg: &str| -> BridgeResult<()> {
        let _ = entered_tx.send(());
        std::thread::sleep(Duration::from_millis(300));
        Ok(())
    }));

    m.begin("loop0", 9600).unwrap();
    assert_eq!(statuses.recv_timeout(DEADLINE).unwrap(), SerialEvent::Started);
    m.print("slow").unwrap();
    entered_rx.recv_timeout(DEADLINE).unwrap();

    // The engine-off report lands while the event thread is still busy.
    m.end().unwrap();
    assert_eq!(statuses.try_recv(), Ok(SerialEvent::Stopped));
    assert!(statuses.try_recv().is_err());
}

#[test]
fn test_begin_uses_configured_link() {
    let config = SerialConfig::from_toml_str("[link]\ndevice = \"loop7\"\nbaud = 57600\n").unwrap();
    let mut m = SerialManager::new(config, LoopbackInterface::discovery()).unwrap();
    let statuses = status_channel(&m);

    m.begin_configured().unwrap();
    assert_eq!(statuses.recv_timeout(DEADLINE).unwrap(), SerialEvent::Started);
    m.end().unwrap();
}

#[test]
fn test_no_hardware() {
    let nothing: Discovery = Box::new(|| None);
    let mut m = SerialManager::new(SerialConfig::default(), nothing).unwrap();
    assert!(!m.is_supported());
    assert_eq!(m.begin("loop0", 9600), Err(BridgeError::InterfaceUnavailable));
    assert!(!m.is_enabled());
}

#[test]
fn test_init_failure() {
    let mut m = SerialManager::new(
        SerialConfig::default(),
        discover(|| LoopbackInterface::new().failing_init(-5)),
    )
    .unwrap();

    assert!(m.is_supported());
    assert_eq!(m.enable(), Err(BridgeError::InitializationFailed { code: -5 }));
    assert!(!m.is_enabled());
    assert!(m.control_channel().is_none());
}

#[test]
fn test_start_failure_leaves_bridge_enabled() {
    let mut m = SerialManager::new(
        SerialConfig::default(),
        discover(|| LoopbackInterface::new().failing_start(-7)),
    )
    .unwrap();

    assert_eq!(
        m.begin("loop0", 9600),
        Err(BridgeError::StartFailed {
            device: "loop0".to_string(),
            code: -7
        })
    );
    assert!(m.is_enabled());
    m.disable().unwrap();
}

#[test]
fn test_stop_failure_still_disables() {
    let mut m = SerialManager::new(
        SerialConfig::default(),
        discover(|| LoopbackInterface::new().failing_stop(-9)),
    )
    .unwrap();

    m.begin("loop0", 9600).unwrap();
    assert_eq!(m.end(), Err(BridgeError::StopFailed { code: -9 }));
    assert!(!m.is_enabled());
}

#[test]
fn test_not_enabled() {
    let mut m = manager();
    assert_eq!(m.print("x"), Err(BridgeError::NotEnabled));
    assert_eq!(m.send(b"x"), Err(BridgeError::NotEnabled));
    assert_eq!(m.end(), Err(BridgeError::NotEnabled));
}

#[test]
fn test_enable_disable_idempotent() {
    let mut m = manager();
    m.enable().unwrap();
    m.enable().unwrap();
    assert!(m.is_enabled());

    m.disable().unwrap();
    m.disable().unwrap();
    assert!(!m.is_enabled());
}

#[test]
fn test_restart_after_end() {
    let mut m = manager();
    let messages = message_channel(&m);

    for round in 0..3 {
        m.begin("loop0", 9600).unwrap();
        m.print(&format!("round {round}")).unwrap();
        assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), format!("round {round}"));
        m.end().unwrap();
    }
}

#[test]
fn test_disconnected_listener_is_removed() {
    let mut m = manager();
    let calls = Arc::new(AtomicUsize::new(0));
    let dropped: Arc<dyn MessageListener> = {
        let calls = Arc::clone(&calls);
        Arc::new(move |_msg: &str| -> BridgeResult<()> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::ListenerDisconnected)
        })
    };
    assert!(m.add_message_listener(Arc::clone(&dropped)));
    let messages = message_channel(&m);

    m.begin("loop0", 9600).unwrap();
    m.print("one").unwrap();
    assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), "one");
    m.print("two").unwrap();
    assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), "two");
    m.end().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!m.remove_message_listener(&dropped));
}

#[test]
fn test_listener_identity() {
    let m = manager();
    let listener: Arc<dyn StatusListener> =
        Arc::new(|_event: SerialEvent| -> BridgeResult<()> { Ok(()) });

    assert!(m.add_status_listener(Arc::clone(&listener)));
    assert!(m.add_status_listener(Arc::clone(&listener)));
    assert!(m.remove_status_listener(&listener));
    assert!(!m.remove_status_listener(&listener));
}

#[test]
fn test_stray_disable_request_keeps_session() {
    let mut m = manager();
    m.enable().unwrap();

    // A stray disable request wakes the event thread; the session stays up.
    let control = m.control_channel().unwrap();
    control.request_disable();
    assert!(m.is_enabled());

    m.disable().unwrap();
}

#[test]
fn test_drop_while_started() {
    let mut m = manager();
    let messages = message_channel(&m);
    m.begin("loop0", 9600).unwrap();
    m.print("bye").unwrap();
    assert_eq!(messages.recv_timeout(DEADLINE).unwrap(), "bye");
    drop(m);
}
