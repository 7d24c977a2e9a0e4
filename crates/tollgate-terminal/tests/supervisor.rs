//! Bootstrap and supervision of whole terminals.

mod common;

use common::Rig;
use std::time::Duration;
use tollgate_core::constants::{EXIT_CRITICAL, EXIT_OK};
use tollgate_core::{DeviceId, Mode, Role};
use tollgate_hardware::mock::{MockButton, MockPrinter, MockRelay, MockScanner};
use tollgate_hardware::{Activation, Port, Ports};
use tollgate_storage::{
    Database, DeviceRepository, SqliteDeviceRepository, SqliteTicketRepository, TicketRepository,
};
use tollgate_terminal::{
    ExitSignal, ExitState, RequestedMode, ResolveError, Supervisor, bootstrap,
};

const TICK: Duration = Duration::from_millis(20);

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_bootstrap_requires_device_id() {
    let rig = Rig::new().await;
    let result = bootstrap(None, RequestedMode::Auto, rig.ports.clone(), rig.db.clone()).await;
    assert!(matches!(result, Err(ResolveError::MissingDeviceId)));
}

#[tokio::test]
async fn test_bootstrap_auto_opens_dependencies() {
    let db = Database::in_memory().await.unwrap();
    let (relay, _relay) = MockRelay::new();
    let (scanner, _scanner) = MockScanner::new();
    let ports = Ports::new().with(relay).with(scanner);
    let device = DeviceId::new("exit").unwrap();

    let terminal = bootstrap(Some(device.clone()), RequestedMode::Auto, ports.clone(), db.clone())
        .await
        .unwrap();
    assert_eq!(terminal.mode, Mode::Scan);
    assert!(ports.get(Role::Relay).unwrap().is_open());
    assert!(ports.get(Role::Scanner).unwrap().is_open());

    let record = SqliteDeviceRepository::new(db.pool().clone())
        .find(&device)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.last_mode.as_deref(), Some("scan"));
}

#[tokio::test]
async fn test_bootstrap_fixed_mode_missing_ports() {
    let db = Database::in_memory().await.unwrap();
    let (scanner, _scanner) = MockScanner::new();
    let ports = Ports::new().with(scanner);

    let result = bootstrap(
        Some(DeviceId::new("gate1").unwrap()),
        RequestedMode::Fixed(Mode::Print),
        ports.clone(),
        db,
    )
    .await;
    assert!(matches!(result, Err(ResolveError::MissingPorts { .. })));
    assert!(!ports.get(Role::Scanner).unwrap().is_open());
}

#[tokio::test]
async fn test_external_exit_is_clean() {
    let rig = Rig::new().await;
    let terminal = bootstrap(
        Some(rig.device.clone()),
        RequestedMode::Fixed(Mode::Print),
        rig.ports.clone(),
        rig.db.clone(),
    )
    .await
    .unwrap();

    let exit = ExitSignal::new();
    let supervisor = Supervisor::new(terminal, exit.clone()).unwrap().with_interval(TICK);
    let task = tokio::spawn(supervisor.run());

    rig.button.press();
    wait_for(|| rig.printer.slips().len() == 1).await;

    exit.exit();
    let state = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(state, ExitState::Exiting);
    assert_eq!(state.exit_code(), EXIT_OK);
    assert_eq!(rig.relay.activations(), vec![Activation::Print]);
    assert!(!rig.ports.get(Role::Button).unwrap().is_open());
    assert!(!rig.ports.get(Role::Relay).unwrap().is_open());
}

#[tokio::test]
async fn test_both_mode_prints_then_admits() {
    let rig = Rig::new().await;
    let terminal = bootstrap(
        Some(rig.device.clone()),
        RequestedMode::Auto,
        rig.ports.clone(),
        rig.db.clone(),
    )
    .await
    .unwrap();
    assert_eq!(terminal.mode, Mode::Both);

    let exit = ExitSignal::new();
    let task = tokio::spawn(
        Supervisor::new(terminal, exit.clone())
            .unwrap()
            .with_interval(TICK)
            .run(),
    );

    rig.button.press();
    wait_for(|| rig.printer.slips().len() == 1).await;

    rig.scanner.scan(rig.printer.slips()[0].code.clone());
    wait_for(|| rig.relay.activations().len() == 2).await;
    assert_eq!(
        rig.relay.activations(),
        vec![Activation::Print, Activation::Scan]
    );

    exit.exit();
    let state = task.await.unwrap();
    assert_eq!(state, ExitState::Exiting);
}

#[tokio::test]
async fn test_both_mode_scan_during_print_pulse() {
    let dir = tempfile::tempdir().unwrap();
    let rig = Rig::on_file(&dir.path().join("tollgate.db"), Duration::from_millis(800)).await;
    let ticket = rig
        .issue(chrono::Duration::minutes(5), chrono::Duration::minutes(120))
        .await;

    let terminal = bootstrap(
        Some(rig.device.clone()),
        RequestedMode::Fixed(Mode::Both),
        rig.ports.clone(),
        rig.db.clone(),
    )
    .await
    .unwrap();

    let exit = ExitSignal::new();
    let task = tokio::spawn(
        Supervisor::new(terminal, exit.clone())
            .unwrap()
            .with_interval(TICK)
            .run(),
    );

    rig.button.press();
    wait_for(|| rig.relay.activations() == [Activation::Print]).await;

    // The print relay is still engaged
    rig.scanner.scan(ticket.code.clone());
    wait_for(|| rig.scanner.flush_count() == 1).await;
    assert_eq!(
        rig.relay.activations(),
        vec![Activation::Print, Activation::Scan]
    );
    assert_eq!(exit.state(), ExitState::Running);

    let used = SqliteTicketRepository::new(rig.db.pool().clone())
        .find_by_id(ticket.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(used.used_by.as_deref(), Some("gate1"));

    wait_for(|| rig.button.flush_count() == 1).await;
    assert_eq!(rig.ticket_count().await, 2);
    assert_eq!(exit.state(), ExitState::Running);

    exit.exit();
    let state = task.await.unwrap();
    assert_eq!(state, ExitState::Exiting);
}

#[tokio::test]
async fn test_worker_crash_escalates() {
    let db = Database::in_memory().await.unwrap();
    let (button, button_handle) = MockButton::new();
    let (relay, _relay) = MockRelay::new();
    let (printer, _printer) = MockPrinter::new();
    let ports = Ports::new().with(button).with(relay).with(printer);

    let terminal = bootstrap(
        Some(DeviceId::new("gate1").unwrap()),
        RequestedMode::Auto,
        ports.clone(),
        db,
    )
    .await
    .unwrap();
    assert_eq!(terminal.mode, Mode::Print);

    // The next read fails with an error the worker cannot handle
    drop(button_handle);

    let exit = ExitSignal::new();
    let supervisor = Supervisor::new(terminal, exit.clone()).unwrap().with_interval(TICK);
    let state = tokio::time::timeout(Duration::from_secs(5), supervisor.run())
        .await
        .unwrap();

    assert_eq!(state, ExitState::CritExiting);
    assert_eq!(state.exit_code(), EXIT_CRITICAL);
    assert_eq!(exit.state(), ExitState::CritExiting);
    assert!(!ports.get(Role::Relay).unwrap().is_open());
}
