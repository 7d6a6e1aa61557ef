//! Batch submission and result draining against the simulated device.

use ud_daq::{
    BatchExecutor, DeviceSession, DrainState, ErrorCode, IoType, MockCall, MockDriver,
    MockScenario, OpenTarget, RequestBatch, UdError,
};

fn open(mock: &MockDriver) -> DeviceSession<MockDriver> {
    DeviceSession::open(mock.clone(), OpenTarget::default()).expect("open simulated U3")
}

#[test]
fn relay_cycle_yields_one_record_per_operation_in_order() {
    let mock = MockDriver::new();
    let mut session = open(&mock);

    let mut batch = RequestBatch::new();
    batch
        .put_dac(0, 2.5)
        .put_dac(1, 2.5)
        .put_digital_bit(3, true)
        .get_digital_bit(2);

    let outcome = session.run(batch).unwrap();
    assert_eq!(outcome.batch_code, ErrorCode::NOERROR);
    assert!(outcome.advisories.is_empty());

    let shape: Vec<_> = outcome
        .records
        .iter()
        .map(|r| (r.io_type, r.channel))
        .collect();
    assert_eq!(
        shape,
        vec![
            (IoType::PutDac, 0),
            (IoType::PutDac, 1),
            (IoType::PutDigitalBit, 3),
            (IoType::GetDigitalBit, 2),
        ]
    );
    assert!(mock.sentinel_reached());
    assert_eq!(mock.dac(0), Some(2.5));
    assert_eq!(mock.dac(1), Some(2.5));
}

#[test]
fn n_reads_yield_n_records() {
    let mock = MockDriver::new();
    for ch in 0..8 {
        mock.set_ain(ch, f64::from(ch) * 0.5);
    }
    let mut session = open(&mock);

    let mut batch = RequestBatch::new();
    for ch in 0..8 {
        batch.get_ain(ch);
    }
    assert_eq!(batch.read_count(), 8);

    let mut cursor = session.execute(batch).unwrap();
    let mut values = Vec::new();
    while let Some(record) = cursor.next_result() {
        values.push(record.unwrap().value);
    }
    assert_eq!(cursor.state(), DrainState::Done);
    assert_eq!(cursor.consumed(), 8);
    assert_eq!(values, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
}

#[test]
fn empty_batch_ends_on_first_call() {
    let mock = MockDriver::new();
    let mut session = open(&mock);

    let mut cursor = session.execute(RequestBatch::new()).unwrap();
    assert!(cursor.first_result().is_none());
    assert_eq!(cursor.state(), DrainState::Done);
}

#[test]
fn cursor_is_single_pass() {
    let mock = MockDriver::new();
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.get_counter(0);

    let mut cursor = session.execute(batch).unwrap();
    assert_eq!(cursor.by_ref().count(), 1);
    assert!(cursor.next().is_none());
    assert!(cursor.next_result().is_none());
    drop(cursor);

    let after_go = mock
        .calls()
        .into_iter()
        .skip_while(|c| *c != MockCall::GoOne)
        .filter(|c| matches!(c, MockCall::FirstResult | MockCall::NextResult))
        .count();
    // first + one next reaching the sentinel
    assert_eq!(after_go, 2);
}

#[test]
fn advisory_codes_do_not_end_the_drain() {
    let mock = MockDriver::new()
        .with_scenario(MockScenario::AdvisoryOnResult {
            execute: 0,
            index: 0,
            code: ErrorCode(-1),
        })
        .with_scenario(MockScenario::AdvisoryOnResult {
            execute: 0,
            index: 2,
            code: ErrorCode(-5),
        });
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.get_ain(0).get_ain(1).get_ain(2);

    let outcome = session.run(batch).unwrap();
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.advisories, vec![ErrorCode(-1), ErrorCode(-5)]);
}

#[test]
fn appended_and_coalesced_entries_follow_the_sentinel_not_the_count() {
    let mock = MockDriver::new()
        .with_scenario(MockScenario::AppendDiagnostic {
            execute: 0,
            io_type: IoType::Other(9999),
        })
        .with_scenario(MockScenario::DropResult {
            execute: 1,
            index: 1,
        });
    let mut session = open(&mock);

    let mut batch = RequestBatch::new();
    batch.get_ain(0).get_ain(1);
    let outcome = session.run(batch.clone()).unwrap();
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.records[2].io_type, IoType::Other(9999));

    let outcome = session.run(batch).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].channel, 0);
}

#[test]
fn invalid_channel_is_reported_at_drain_time() {
    let mock = MockDriver::new();
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.get_digital_bit(42);

    // Queueing does not validate channels.
    let mut cursor = session.execute(batch).unwrap();
    let err = cursor.next_result().unwrap().unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::INVALID_CHANNEL_NUMBER));
    assert!(err.to_string().contains("Invalid channel number"));
    assert_eq!(cursor.state(), DrainState::Aborted);
    assert!(cursor.next_result().is_none());
}

#[test]
fn fatal_execute_poisons_session_and_closes_on_drop() {
    let mock = MockDriver::new().with_scenario(MockScenario::FailExecute {
        execute: 0,
        code: ErrorCode::COMM_FAILURE,
    });
    {
        let mut session = open(&mock);
        let mut batch = RequestBatch::new();
        batch.put_dac(0, 1.0);

        let err = session.execute(batch).map(|_| ()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Comm failure"));
        assert_eq!(session.poisoned(), Some(ErrorCode::COMM_FAILURE));

        let err = session.e_put(IoType::PutDac, 0, 1.0, 0.0).unwrap_err();
        assert!(matches!(err, UdError::SessionPoisoned { .. }));
    }
    assert!(mock.open_handles().is_empty());
    assert_eq!(mock.close_count(), 1);
    assert_eq!(mock.execute_count(), 1);
}

#[test]
fn recoverable_execute_code_is_reported_as_batch_code() {
    let mock = MockDriver::new().with_scenario(MockScenario::FailExecute {
        execute: 0,
        code: ErrorCode(1),
    });
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.put_dac(0, 1.0);

    // The device executed nothing, so the drain is empty.
    let outcome = session.run(batch).unwrap();
    assert_eq!(outcome.batch_code, ErrorCode(1));
    assert!(outcome.records.is_empty());
    assert!(session.poisoned().is_none());
}

#[test]
fn configuration_helpers_run_one_request_each() {
    let mock = MockDriver::new();
    mock.set_external_level(6, false);
    mock.set_counter(1, 42);
    let mut session = open(&mock);

    session
        .e_put(IoType::PinConfigurationReset, 0, 0.0, 0.0)
        .unwrap();
    session
        .e_put(IoType::PutAnalogEnablePort, 0, 15.0, 16.0)
        .unwrap();
    session.e_put(IoType::PutCounterEnable, 1, 1.0, 0.0).unwrap();

    let port = session.e_get(IoType::GetDigitalPort, 5, 2.0).unwrap();
    assert_eq!(port, 1.0);
    let count = session.e_get(IoType::GetCounter, 1, 0.0).unwrap();
    assert_eq!(count, 42.0);
    assert_eq!(mock.execute_count(), 5);
}

#[test]
fn recoverable_add_request_code_is_reported_as_batch_code() {
    let mock = MockDriver::new().with_scenario(MockScenario::FailAddRequest {
        request: 1,
        code: ErrorCode::INVALID_PARAMETER,
    });
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.get_ain(0).get_ain(1).get_ain(2);

    let outcome = session.run(batch).unwrap();
    assert_eq!(outcome.batch_code, ErrorCode::INVALID_PARAMETER);
    let channels: Vec<i32> = outcome.records.iter().map(|r| r.channel).collect();
    assert_eq!(channels, vec![0, 2]);
    assert!(session.poisoned().is_none());
}

#[test]
fn fatal_add_request_code_poisons_before_execute() {
    let mock = MockDriver::new().with_scenario(MockScenario::FailAddRequest {
        request: 0,
        code: ErrorCode::COMM_FAILURE,
    });
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.get_ain(0).get_ain(1);

    let err = session.execute(batch).map(|_| ()).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(session.poisoned(), Some(ErrorCode::COMM_FAILURE));
    assert_eq!(mock.execute_count(), 0);
    // Queueing stops at the failing request.
    let queued = mock
        .calls()
        .iter()
        .filter(|c| matches!(c, MockCall::AddRequest(_)))
        .count();
    assert_eq!(queued, 1);
}

#[test]
fn fatal_code_while_discarding_poisons_session() {
    let mock = MockDriver::new().with_scenario(MockScenario::ErrorOnResult {
        execute: 0,
        index: 2,
        code: ErrorCode::COMM_FAILURE,
    });
    let mut session = open(&mock);
    let mut batch = RequestBatch::new();
    batch.get_ain(0).get_ain(1).get_ain(2).get_ain(3);

    {
        let mut cursor = session.execute(batch).unwrap();
        let first = cursor.next_result().unwrap().unwrap();
        assert_eq!(first.channel, 0);
    }

    assert_eq!(session.poisoned(), Some(ErrorCode::COMM_FAILURE));
    assert!(!mock.sentinel_reached());
    let err = session.e_get(IoType::GetAin, 0, 0.0).unwrap_err();
    assert!(matches!(err, UdError::SessionPoisoned { .. }));
    assert_eq!(mock.execute_count(), 1);
}

#[test]
fn oversized_digital_port_width_is_an_invalid_channel() {
    let mock = MockDriver::new();
    let mut session = open(&mock);

    let err = session.e_get(IoType::GetDigitalPort, 5, 1e10).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::INVALID_CHANNEL_NUMBER));
    assert!(session.poisoned().is_none());
}
