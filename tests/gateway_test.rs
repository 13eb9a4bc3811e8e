use tagbus::error::TagError;
use tagbus::gateway::Gateway;
use tagbus::image::{Modification, ProcessImage};
use tagbus::services::FieldServices;
use tagbus::types::{Indexed, UnitId, Value};

use std::sync::Arc;

fn setup() -> (Arc<ProcessImage>, Gateway, FieldServices, UnitId) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let unit = UnitId::new(1);
    let image = Arc::new(ProcessImage::new());
    let gateway = Gateway::new(image.clone());
    let services = FieldServices::single(unit, image.clone());
    (image, gateway, services, unit)
}

#[test]
fn alternating_bit_writes_produce_the_expected_register_pattern() {
    let (_, gateway, services, unit) = setup();

    for bit in 0..32 {
        let address = format!("HR<uint32>0.{bit}");
        gateway
            .write(&address, Value::Bool(bit % 2 == 0), None)
            .unwrap();
    }

    assert_eq!(
        gateway.read("HR<uint32>0", None).unwrap(),
        Value::UInt32(0x5555_5555)
    );
    assert_eq!(
        services.read_holding_registers(unit, 0, 2).unwrap(),
        vec![0x55, 0x55, 0x55, 0x55]
    );
}

#[test]
fn concurrent_writers_of_distinct_bits_lose_no_updates() {
    let (image, gateway, _, _) = setup();

    let handles: Vec<_> = (0..32)
        .map(|bit| {
            let image = image.clone();
            std::thread::spawn(move || {
                let gateway = Gateway::new(image);
                let address = format!("HR<uint32>0.{bit}");
                gateway.write(&address, Value::Bool(true), None).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        gateway.read("HR<uint32>0", None).unwrap(),
        Value::UInt32(0xFFFF_FFFF)
    );
}

// The transactional read-modify-write exists because the split version loses
// updates. This spells the interleaving out sequentially: both writers read
// the initial value, then each writes its own modification back.
#[test]
fn split_read_then_write_demonstrably_loses_an_update() {
    let (_, gateway, _, _) = setup();

    let first = match gateway.read("HR<uint16>0", None).unwrap() {
        Value::UInt16(v) => v,
        other => panic!("unexpected value {other:?}"),
    };
    let second = first;

    gateway
        .write("HR<uint16>0", Value::UInt16(first | 0x0001), None)
        .unwrap();
    gateway
        .write("HR<uint16>0", Value::UInt16(second | 0x0002), None)
        .unwrap();

    // the second write clobbers the first writer's bit
    assert_eq!(
        gateway.read("HR<uint16>0", None).unwrap(),
        Value::UInt16(0x0002)
    );

    // the same interleaving through bit addresses keeps both
    gateway.write("HR<uint16>1.0", Value::Bool(true), None).unwrap();
    gateway.write("HR<uint16>1.1", Value::Bool(true), None).unwrap();
    assert_eq!(
        gateway.read("HR<uint16>1", None).unwrap(),
        Value::UInt16(0x0003)
    );
}

#[test]
fn supervisory_writes_are_visible_to_field_reads() {
    let (_, gateway, services, unit) = setup();

    gateway
        .write("HR<float>100", Value::Float32(1.234), None)
        .unwrap();
    assert_eq!(
        services.read_holding_registers(unit, 100, 2).unwrap(),
        vec![0x3F, 0x9D, 0xF3, 0xB6]
    );

    gateway.write("C7", Value::Bool(true), None).unwrap();
    assert_eq!(services.read_coils(unit, 7, 1).unwrap(), vec![0x01]);
}

#[test]
fn field_writes_are_visible_to_supervisory_reads() {
    let (_, gateway, services, unit) = setup();

    services
        .write_multiple_registers(unit, 200, 2, &[0x12, 0x34, 0x56, 0x78])
        .unwrap();
    assert_eq!(
        gateway.read("HR<uint32>200", None).unwrap(),
        Value::UInt32(0x1234_5678)
    );

    services.write_single_coil(unit, Indexed::new(3, true)).unwrap();
    assert_eq!(gateway.read("C3", None).unwrap(), Value::Bool(true));
}

#[test]
fn input_registers_written_by_the_supervisor_serve_field_polls() {
    let (_, gateway, services, unit) = setup();

    gateway
        .write("IR<int16>10", Value::Int16(-2), None)
        .unwrap();
    assert_eq!(
        services.read_input_registers(unit, 10, 1).unwrap(),
        vec![0xFF, 0xFE]
    );
}

#[tokio::test]
async fn committed_writes_reach_the_modification_listener() {
    let (image, gateway, _, _) = setup();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    image.set_modification_listener(tx);

    gateway
        .write("HR<uint32>10", Value::UInt32(0x0001_0002), None)
        .unwrap();

    assert_eq!(
        rx.recv().await,
        Some(Modification::HoldingRegister {
            offset: 10,
            value: [0x00, 0x01]
        })
    );
    assert_eq!(
        rx.recv().await,
        Some(Modification::HoldingRegister {
            offset: 11,
            value: [0x00, 0x02]
        })
    );
}

#[tokio::test]
async fn a_rejected_write_emits_no_modifications() {
    let (image, gateway, _, _) = setup();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    image.set_modification_listener(tx);

    assert_eq!(
        gateway.write("HR<int16>0", Value::UInt16(1), None),
        Err(TagError::TypeMismatch)
    );

    assert!(rx.try_recv().is_err());
}
