//! Integration tests for the XRS entity hub
//!
//! These tests verify end-to-end behavior of the hub including:
//! - Registration rules for every category and key
//! - Dispatch routing and publish ordering
//! - Dynamic select option sets
//! - Number clamping and command gating on link state
//! - Periodic location publication
//! - The hub actor driving a virtual radio over an in-memory stream

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use xrs_hub::{
    BinaryKey, BridgeConfig, EntityDescriptor, EntitySink, HubCommand, HubError, HubSettings,
    NullSink, NumberKey, RadioHub, SelectKey, SignalKey, SinkFactory, StateValue, SwitchKey,
    TextKey, Transport, TypedEntity,
};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Something an entity sink received
    #[derive(Debug, Clone, PartialEq)]
    pub enum Published {
        State(StateValue),
        Options(Vec<String>, Option<String>),
    }

    /// Sink that records everything into a shared log
    #[derive(Clone, Default)]
    pub struct Recorder(pub Arc<Mutex<Vec<Published>>>);

    impl Recorder {
        pub fn states(&self) -> Vec<StateValue> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|p| match p {
                    Published::State(v) => Some(v.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn last_options(&self) -> Option<(Vec<String>, Option<String>)> {
            self.0.lock().unwrap().iter().rev().find_map(|p| match p {
                Published::Options(o, s) => Some((o.clone(), s.clone())),
                _ => None,
            })
        }

        pub fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl EntitySink for Recorder {
        fn publish_state(&mut self, value: &StateValue) {
            self.0.lock().unwrap().push(Published::State(value.clone()));
        }

        fn publish_options(&mut self, options: &[String], selected: Option<&str>) {
            self.0.lock().unwrap().push(Published::Options(
                options.to_vec(),
                selected.map(str::to_string),
            ));
        }
    }

    /// Transport that records every command it is handed
    #[derive(Clone, Default)]
    pub struct RecordingTransport(pub Arc<Mutex<Vec<HubCommand>>>);

    impl RecordingTransport {
        pub fn sent(&self) -> Vec<HubCommand> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, command: HubCommand) {
            self.0.lock().unwrap().push(command);
        }
    }

    pub fn new_hub() -> (RadioHub, RecordingTransport) {
        let transport = RecordingTransport::default();
        let hub = RadioHub::new(
            HubSettings::new("AA:BB:CC:DD:EE:FF"),
            Box::new(transport.clone()),
        );
        (hub, transport)
    }

    /// Register one recorded entity and return its recorder
    pub fn add(hub: &mut RadioHub, key: impl Into<SignalKey>) -> Recorder {
        let key = key.into();
        let recorder = Recorder::default();
        hub.register(TypedEntity::new(key, key.to_string(), Box::new(recorder.clone())))
            .unwrap();
        recorder
    }

    pub fn options(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Sink factory keyed by signal key
    #[derive(Clone, Default)]
    pub struct Recorders(pub Arc<Mutex<HashMap<SignalKey, Recorder>>>);

    impl Recorders {
        pub fn get(&self, key: impl Into<SignalKey>) -> Recorder {
            self.0.lock().unwrap().get(&key.into()).cloned().unwrap_or_default()
        }
    }

    impl SinkFactory for Recorders {
        fn entity_sink(&mut self, descriptor: &EntityDescriptor) -> Box<dyn EntitySink> {
            let recorder = Recorder::default();
            self.0
                .lock()
                .unwrap()
                .insert(descriptor.key, recorder.clone());
            Box::new(recorder)
        }

        fn location_sink(&mut self, _hub_id: &str, _sensor_id: &str) -> Box<dyn EntitySink> {
            Box::new(NullSink)
        }
    }
}

use helpers::*;

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_duplicate_registration_for_every_key() {
    let (mut hub, _) = new_hub();
    for key in SignalKey::all() {
        hub.register(TypedEntity::new(key, "first", Box::new(NullSink)))
            .unwrap();
        let err = hub
            .register(TypedEntity::new(key, "second", Box::new(NullSink)))
            .unwrap_err();
        assert_eq!(err, HubError::DuplicateRegistration(key));
    }
    assert_eq!(hub.entity_count(), SignalKey::all().count());
}

#[test]
fn test_same_name_in_different_categories_coexist() {
    let (mut hub, _) = new_hub();
    add(&mut hub, xrs_hub::SensorKey::Volume);
    add(&mut hub, NumberKey::Volume);
    add(&mut hub, BinaryKey::QuietMode);
    add(&mut hub, SwitchKey::QuietMode);
    assert_eq!(hub.entity_count(), 4);
}

#[test]
fn test_registration_closed_after_freeze() {
    let (mut hub, _) = new_hub();
    hub.freeze();
    assert_eq!(
        hub.register(TypedEntity::new(TextKey::Model, "Model", Box::new(NullSink))),
        Err(HubError::RegistryFrozen(TextKey::Model.into()))
    );
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_dispatch_without_registration_is_noop() {
    let (mut hub, _) = new_hub();
    let model = add(&mut hub, TextKey::Model);
    hub.freeze();

    hub.dispatch(BinaryKey::PttActive, true);
    hub.dispatch(SwitchKey::Scan, false);

    assert_eq!(model.len(), 0);
    assert_eq!(hub.stats().unroutable, 2);
    assert_eq!(hub.stats().dispatched, 0);
}

#[test]
fn test_binary_publishes_in_dispatch_order() {
    let (mut hub, _) = new_hub();
    let connected = add(&mut hub, BinaryKey::Connected);
    let ptt = add(&mut hub, BinaryKey::PttActive);
    hub.freeze();

    hub.dispatch(BinaryKey::Connected, true);
    hub.dispatch(BinaryKey::Connected, false);
    hub.dispatch(BinaryKey::PttActive, true);

    assert_eq!(connected.states(), vec![StateValue::Bool(true), StateValue::Bool(false)]);
    assert_eq!(
        hub.entity(BinaryKey::Connected.into()).unwrap().state(),
        Some(&StateValue::Bool(false))
    );
    assert_eq!(ptt.states(), vec![StateValue::Bool(true)]);
}

#[test]
fn test_wrong_value_type_is_absorbed() {
    let (mut hub, _) = new_hub();
    let volume = add(&mut hub, NumberKey::Volume);
    hub.freeze();

    hub.dispatch(NumberKey::Volume, "loud");
    assert!(volume.states().is_empty());
    assert_eq!(hub.stats().rejected, 1);
}

#[test]
fn test_connection_state_is_published() {
    let (mut hub, _) = new_hub();
    let connected = add(&mut hub, BinaryKey::Connected);
    hub.freeze();

    hub.notify_connection_state(true);
    hub.notify_connection_state(false);
    assert_eq!(connected.states(), vec![true.into(), false.into()]);
    assert!(!hub.is_connected());
}

// ============================================================================
// Select option sets
// ============================================================================

#[test]
fn test_select_refresh_sequence() {
    let (mut hub, _) = new_hub();
    let zone = add(&mut hub, SelectKey::Zone);
    hub.freeze();

    hub.refresh_select_options(SelectKey::Zone, options(&["A", "B", "C"]), Some("B".into()));
    assert_eq!(
        zone.last_options(),
        Some((options(&["A", "B", "C"]), Some("B".to_string())))
    );

    hub.dispatch(SelectKey::Zone, "C");
    assert_eq!(zone.states().last(), Some(&StateValue::from("C")));

    // Current selection vanishes from the set
    hub.refresh_select_options(SelectKey::Zone, options(&["A", "B"]), Some("C".into()));
    assert_eq!(zone.last_options(), Some((options(&["A", "B"]), None)));
    let entity = hub.entity(SelectKey::Zone.into()).unwrap();
    assert_eq!(entity.options().unwrap().selected(), None);

    // Stale dispatch is ignored
    hub.dispatch(SelectKey::Zone, "C");
    assert_eq!(hub.stats().rejected, 1);
    assert_eq!(
        hub.entity(SelectKey::Zone.into()).unwrap().options().unwrap().selected(),
        None
    );
}

#[test]
fn test_select_refresh_replaces_set_and_selection_together() {
    let (mut hub, _) = new_hub();
    let zone = add(&mut hub, SelectKey::Zone);
    hub.freeze();

    hub.refresh_select_options(SelectKey::Zone, options(&["Z1", "Z2"]), Some("Z1".into()));
    hub.refresh_select_options(SelectKey::Zone, options(&["Z3"]), Some("Z3".into()));

    assert_eq!(
        zone.last_options(),
        Some((options(&["Z3"]), Some("Z3".to_string())))
    );
    let set = hub.entity(SelectKey::Zone.into()).unwrap().options().unwrap();
    assert_eq!(set.options(), options(&["Z3"]).as_slice());
    assert_eq!(set.selected(), Some("Z3"));
}

#[test]
fn test_select_command_requires_current_option() {
    let (mut hub, transport) = new_hub();
    add(&mut hub, SelectKey::Channel);
    hub.freeze();
    hub.notify_connection_state(true);
    hub.refresh_select_options(
        SelectKey::Channel,
        options(&["Z1 / Ch 1", "Z1 / Ch 2"]),
        None,
    );

    assert!(matches!(
        hub.command(SelectKey::Channel.into(), "Z1 / Ch 3".into()),
        Err(HubError::StaleSelection { .. })
    ));
    hub.command(SelectKey::Channel.into(), "Z1 / Ch 2".into())
        .unwrap();
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn test_refresh_unregistered_select_is_ignored() {
    let (mut hub, _) = new_hub();
    hub.freeze();
    hub.refresh_select_options(SelectKey::Channel, options(&["x"]), Some("x".into()));
    assert!(hub.entity(SelectKey::Channel.into()).is_none());
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_number_commands_clamp_to_bounds() {
    let (mut hub, transport) = new_hub();
    add(&mut hub, NumberKey::Volume);
    hub.freeze();
    hub.notify_connection_state(true);

    hub.command(NumberKey::Volume.into(), StateValue::Float(50.0))
        .unwrap();
    hub.command(NumberKey::Volume.into(), StateValue::Float(-5.0))
        .unwrap();

    let values: Vec<StateValue> = transport.sent().into_iter().map(|c| c.value).collect();
    assert_eq!(values, vec![StateValue::Float(31.0), StateValue::Float(0.0)]);
    assert_eq!(hub.stats().commands_clamped, 2);
}

#[test]
fn test_send_command_while_disconnected_never_reaches_transport() {
    let (mut hub, transport) = new_hub();
    add(&mut hub, SwitchKey::Scan);
    hub.freeze();

    hub.send_command(SwitchKey::Scan, true);
    hub.command(SwitchKey::Scan.into(), true.into()).unwrap();
    assert!(transport.sent().is_empty());
    assert_eq!(hub.stats().commands_dropped, 2);

    hub.notify_connection_state(true);
    hub.send_command(SwitchKey::Scan, true);
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn test_command_errors() {
    let (mut hub, _) = new_hub();
    add(&mut hub, BinaryKey::Scanning);
    add(&mut hub, SwitchKey::Scan);
    hub.freeze();

    assert_eq!(
        hub.command(BinaryKey::Scanning.into(), true.into()),
        Err(HubError::NotWritable(BinaryKey::Scanning.into()))
    );
    assert_eq!(
        hub.command(SwitchKey::Duplex.into(), true.into()),
        Err(HubError::UnknownEntity(SwitchKey::Duplex.into()))
    );
    assert!(matches!(
        hub.command(SwitchKey::Scan.into(), "on".into()),
        Err(HubError::InvalidValue { .. })
    ));
}

#[test]
fn test_command_does_not_change_local_state() {
    let (mut hub, _) = new_hub();
    let scan = add(&mut hub, SwitchKey::Scan);
    hub.freeze();
    hub.notify_connection_state(true);

    hub.command(SwitchKey::Scan.into(), true.into()).unwrap();
    assert!(scan.states().is_empty());
    assert!(hub.entity(SwitchKey::Scan.into()).unwrap().state().is_none());
}

// ============================================================================
// Location reporting
// ============================================================================

#[test]
fn test_location_published_once_per_window() {
    let (mut hub, _) = new_hub();
    hub.freeze();
    let lat = Recorder::default();
    let lon = Recorder::default();
    hub.set_location_sensors(Box::new(lat.clone()), Box::new(lon.clone()));

    let t0 = Instant::now();
    hub.set_location_interval_at(Duration::from_secs(60), t0);

    // No fix yet
    assert_eq!(hub.poll_location(t0 + Duration::from_secs(30)), None);
    assert_eq!(hub.poll_location(t0 + Duration::from_secs(60)), None);
    assert_eq!(lat.len(), 0);

    hub.update_location_fix(-33.8688, 151.2093);
    hub.update_location_fix(f64::NAN, 0.0);
    assert!(hub.poll_location(t0 + Duration::from_secs(90)).is_none());
    assert!(hub.poll_location(t0 + Duration::from_secs(120)).is_some());
    assert!(hub.poll_location(t0 + Duration::from_secs(121)).is_none());

    // A new fix does not move the window
    hub.update_location_fix(-33.9, 151.3);
    assert!(hub.poll_location(t0 + Duration::from_secs(179)).is_none());
    let fix = hub.poll_location(t0 + Duration::from_secs(180)).unwrap();
    assert_eq!(fix.latitude, -33.9);

    assert_eq!(lat.len(), 2);
    assert_eq!(lon.states(), vec![StateValue::Float(151.2093), StateValue::Float(151.3)]);
    assert_eq!(hub.stats().location_reports, 2);
}

#[test]
fn test_location_without_sensors_still_returns_fix() {
    let (mut hub, _) = new_hub();
    hub.freeze();
    let t0 = Instant::now();
    hub.set_location_interval_at(Duration::from_secs(10), t0);
    hub.update_location_fix(1.0, 2.0);

    assert!(hub.poll_location(t0 + Duration::from_secs(10)).is_some());
    assert_eq!(hub.stats().location_reports, 0);
}

#[test]
fn test_changing_interval_resets_anchor() {
    let (mut hub, _) = new_hub();
    hub.freeze();
    hub.update_location_fix(1.0, 2.0);
    let t0 = Instant::now();
    hub.set_location_interval_at(Duration::from_secs(60), t0);
    hub.set_location_interval_at(Duration::from_secs(60), t0 + Duration::from_secs(50));

    assert!(hub.poll_location(t0 + Duration::from_secs(60)).is_none());
    assert!(hub.poll_location(t0 + Duration::from_secs(110)).is_some());
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum SelectOp {
        Refresh(Vec<usize>, Option<usize>),
        Dispatch(usize),
    }

    const POOL: [&str; 6] = ["Zone 1", "Zone 2", "Zone 3", "Zone 4", "Zone 5", "Zone 6"];

    fn select_op() -> impl Strategy<Value = SelectOp> {
        prop_oneof![
            (
                proptest::collection::vec(0..POOL.len(), 0..POOL.len()),
                proptest::option::of(0..POOL.len())
            )
                .prop_map(|(set, current)| SelectOp::Refresh(set, current)),
            (0..POOL.len()).prop_map(SelectOp::Dispatch),
        ]
    }

    proptest! {
        #[test]
        fn selection_always_in_option_set(ops in proptest::collection::vec(select_op(), 1..40)) {
            let (mut hub, _) = new_hub();
            add(&mut hub, SelectKey::Zone);
            hub.freeze();

            for op in ops {
                match op {
                    SelectOp::Refresh(set, current) => {
                        let mut opts: Vec<String> = set.iter().map(|i| POOL[*i].to_string()).collect();
                        opts.dedup();
                        hub.refresh_select_options(
                            SelectKey::Zone,
                            opts,
                            current.map(|i| POOL[i].to_string()),
                        );
                    }
                    SelectOp::Dispatch(i) => hub.dispatch(SelectKey::Zone, POOL[i]),
                }

                let set = hub.entity(SelectKey::Zone.into()).unwrap().options().unwrap();
                if let Some(selected) = set.selected() {
                    prop_assert!(set.contains(selected));
                }
            }
        }

        #[test]
        fn number_commands_stay_in_bounds(value in -1000.0f32..1000.0f32) {
            let (mut hub, transport) = new_hub();
            add(&mut hub, NumberKey::Volume);
            hub.freeze();
            hub.notify_connection_state(true);

            hub.command(NumberKey::Volume.into(), StateValue::Float(value)).unwrap();
            let sent = transport.sent();
            let StateValue::Float(v) = sent[0].value else {
                panic!("expected a float");
            };
            prop_assert!((0.0..=31.0).contains(&v));
            if (0.0..=31.0).contains(&value) {
                prop_assert_eq!(v, value);
            }
        }

        #[test]
        fn publish_order_matches_dispatch_order(values in proptest::collection::vec(any::<bool>(), 0..50)) {
            let (mut hub, _) = new_hub();
            let recorder = add(&mut hub, BinaryKey::Scanning);
            hub.freeze();

            for v in &values {
                hub.dispatch(BinaryKey::Scanning, *v);
            }
            let expected: Vec<StateValue> = values.into_iter().map(StateValue::Bool).collect();
            prop_assert_eq!(recorder.states(), expected);
        }
    }
}

// ============================================================================
// Actor with virtual radio
// ============================================================================

mod actor_tests {
    use super::*;
    use tokio::sync::{broadcast, mpsc};
    use xrs_hub::{
        run_hub_actor, HubHandle, RadioLink, XrsDevice, AT_QUEUE_CAPACITY,
        COMMAND_QUEUE_CAPACITY, INPUT_QUEUE_CAPACITY,
    };
    use xrs_protocol::AtCommand;
    use xrs_sim::{run_virtual_radio_task, VirtualRadioCommand, VirtualXrsRadio};

    const CONFIG: &str = r#"
xrs_radio:
  - id: radio
    mac_address: "AA:BB:CC:DD:EE:FF"
binary_sensor:
  - type: connected
  - type: ptt_active
sensor:
  - type: volume
text_sensor:
  - type: manufacturer
  - type: channel_label
switch:
  - type: scan
number:
  - type: volume
select:
  - type: zone
  - type: channel
"#;

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not met in time");
    }

    async fn wait_for_command(rx: &mut broadcast::Receiver<AtCommand>, expected: AtCommand) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if rx.recv().await.unwrap() == expected {
                    break;
                }
            }
        })
        .await
        .expect("command not seen in time");
    }

    #[tokio::test]
    async fn test_actor_drives_virtual_radio() {
        let config = BridgeConfig::from_yaml_str(CONFIG).unwrap();
        let mut recorders = Recorders::default();

        let (command_tx, command_rx) = mpsc::channel::<HubCommand>(COMMAND_QUEUE_CAPACITY);
        let hub = config
            .build_hub("radio", Box::new(command_tx), &mut recorders)
            .unwrap();

        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let (at_tx, mut at_rx) = mpsc::channel(AT_QUEUE_CAPACITY);
        let (link_end, radio_end) = tokio::io::duplex(4096);

        let (sim_tx, sim_rx) = mpsc::channel(8);
        let (seen_tx, mut seen_rx) = broadcast::channel(64);
        let sim = tokio::spawn(run_virtual_radio_task(
            radio_end,
            VirtualXrsRadio::default(),
            sim_rx,
            seen_tx,
        ));

        let link_input = input_tx.clone();
        let link = tokio::spawn(async move {
            RadioLink::new("sim", link_end)
                .run(&link_input, &mut at_rx)
                .await
        });

        let actor = tokio::spawn(run_hub_actor(
            hub,
            XrsDevice::new(),
            input_rx,
            command_rx,
            at_tx,
        ));
        let handle = HubHandle::new(input_tx);

        // Handshake identifies the radio and loads the channel table
        let manufacturer = recorders.get(TextKey::Manufacturer);
        wait_for(|| manufacturer.states().contains(&"GME".into())).await;
        let connected = recorders.get(BinaryKey::Connected);
        assert_eq!(connected.states().first(), Some(&StateValue::Bool(true)));

        let channel_select = recorders.get(SelectKey::Channel);
        wait_for(|| {
            channel_select
                .last_options()
                .map(|(opts, _)| opts.contains(&"Z1 / Ch 40: Repeater".to_string()))
                .unwrap_or(false)
        })
        .await;

        // Switch command round-trips through the radio
        handle
            .command(SwitchKey::Scan.into(), true.into())
            .await
            .unwrap();
        let scan = recorders.get(SwitchKey::Scan);
        wait_for(|| scan.states().last() == Some(&StateValue::Bool(true))).await;

        // Out-of-range volume is clamped before it reaches the radio
        handle
            .command(NumberKey::Volume.into(), StateValue::Float(50.0))
            .await
            .unwrap();
        wait_for_command(&mut seen_rx, AtCommand::SetVolume(31)).await;
        let volume = recorders.get(NumberKey::Volume);
        wait_for(|| volume.states().last() == Some(&StateValue::Float(31.0))).await;

        // Channel selection updates the label
        handle
            .command(SelectKey::Channel.into(), "Z1 / Ch 40: Repeater".into())
            .await
            .unwrap();
        let label = recorders.get(TextKey::ChannelLabel);
        wait_for(|| label.states().last() == Some(&StateValue::from("Repeater"))).await;

        // Front-panel PTT shows up as a binary sensor
        sim_tx
            .send(VirtualRadioCommand::Ptt { state: 1, timer: 0 })
            .await
            .unwrap();
        let ptt = recorders.get(BinaryKey::PttActive);
        wait_for(|| ptt.states().last() == Some(&StateValue::Bool(true))).await;

        // Rejections come back to the caller
        assert_eq!(
            handle
                .command(BinaryKey::Connected.into(), true.into())
                .await,
            Err(HubError::NotWritable(BinaryKey::Connected.into()))
        );
        assert!(matches!(
            handle
                .command(SelectKey::Zone.into(), "Zone 42".into())
                .await,
            Err(HubError::StaleSelection { .. })
        ));

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.commands_clamped, 1);
        assert_eq!(stats.commands_sent, 3);

        handle.shutdown().await;
        let hub = actor.await.unwrap();
        assert!(hub.is_connected());
        assert_eq!(
            hub.entity(SwitchKey::Scan.into()).unwrap().state(),
            Some(&StateValue::Bool(true))
        );

        link.await.unwrap();
        sim_tx.send(VirtualRadioCommand::Shutdown).await.ok();
        let radio = sim.await.unwrap().unwrap();
        assert!(radio.scan());
        assert_eq!(radio.volume(), 31);
        assert_eq!((radio.zone(), radio.channel()), (1, 40));
    }

    #[tokio::test]
    async fn test_link_down_marks_disconnected_and_drops_commands() {
        let (command_tx, command_rx) = mpsc::channel::<HubCommand>(COMMAND_QUEUE_CAPACITY);
        let mut hub = RadioHub::new(HubSettings::new("AA:BB:CC:DD:EE:FF"), Box::new(command_tx));
        let connected = add(&mut hub, BinaryKey::Connected);
        add(&mut hub, SwitchKey::Scan);
        hub.freeze();

        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let (at_tx, mut at_rx) = mpsc::channel(AT_QUEUE_CAPACITY);
        let actor = tokio::spawn(run_hub_actor(hub, XrsDevice::new(), input_rx, command_rx, at_tx));
        let handle = HubHandle::new(input_tx.clone());

        input_tx.send(xrs_hub::HubInput::LinkUp).await.unwrap();
        // Handshake is queued for the link
        assert_eq!(at_rx.recv().await, Some(AtCommand::EchoOn));

        input_tx.send(xrs_hub::HubInput::LinkDown).await.unwrap();
        handle
            .command(SwitchKey::Scan.into(), true.into())
            .await
            .unwrap();

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.commands_dropped, 1);
        assert_eq!(stats.commands_sent, 0);

        handle.shutdown().await;
        let hub = actor.await.unwrap();
        assert!(!hub.is_connected());
        assert_eq!(connected.states(), vec![true.into(), false.into()]);
    }
}
