//! Integration tests for the channel proxy, including blocking across threads

use luar::sdk::{ChanDir, ChanRef};
use luar::{convert, BridgeError, ErrorCategory, HostType, HostValue, ScriptValue, State};

fn receive(state: &State, ch: &ScriptValue) -> Vec<ScriptValue> {
    state.call_method(ch, "receive", vec![]).unwrap()
}

#[test]
fn test_receive_on_closed_channel_is_repeatable() {
    let state = State::new();
    let ch = convert(&state, ChanRef::new(HostType::STRING, 0).into()).unwrap();
    state.call_method(&ch, "close", vec![]).unwrap();

    for _ in 0..3 {
        assert_eq!(receive(&state, &ch), vec![ScriptValue::Nil, ScriptValue::Bool(false)]);
    }
}

#[test]
fn test_buffered_send_receive() {
    let state = State::new();
    let ch = convert(&state, ChanRef::new(HostType::INT64, 2).into()).unwrap();

    state.call_method(&ch, "send", vec![ScriptValue::Number(1.0)]).unwrap();
    state.call_method(&ch, "send", vec![ScriptValue::Number(2.0)]).unwrap();
    assert_eq!(receive(&state, &ch), vec![ScriptValue::Number(1.0), ScriptValue::Bool(true)]);

    // Buffered values survive close
    state.call_method(&ch, "close", vec![]).unwrap();
    assert_eq!(receive(&state, &ch), vec![ScriptValue::Number(2.0), ScriptValue::Bool(true)]);
    assert_eq!(receive(&state, &ch), vec![ScriptValue::Nil, ScriptValue::Bool(false)]);
}

#[test]
fn test_close_twice_is_fatal() {
    let state = State::new();
    let ch = convert(&state, ChanRef::new(HostType::INT, 1).into()).unwrap();
    state.call_method(&ch, "close", vec![]).unwrap();

    let err = state.call_method(&ch, "close", vec![]).unwrap_err();
    assert_eq!(err, BridgeError::CloseOfClosedChannel);
    assert_eq!(err.category(), ErrorCategory::Protocol);

    let err = state
        .call_method(&ch, "send", vec![ScriptValue::Number(1.0)])
        .unwrap_err();
    assert_eq!(err, BridgeError::SendOnClosedChannel);
}

#[test]
fn test_send_checks_element_type() {
    let state = State::new();
    let ch = convert(&state, ChanRef::new(HostType::INT64, 1).into()).unwrap();
    let err = state
        .call_method(&ch, "send", vec!["not a number".into()])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);

    let err = state.call_method(&ch, "send", vec![]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Arity);
}

#[test]
fn test_direction_enforced() {
    let state = State::new();
    let both = ChanRef::new(HostType::INT64, 1);
    let recv_only = convert(&state, both.restrict(ChanDir::Recv).into()).unwrap();
    let err = state
        .call_method(&recv_only, "send", vec![ScriptValue::Number(1.0)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::ChannelDirection { op: "send", .. }));
}

#[test]
fn test_unknown_channel_member_is_nil() {
    let state = State::new();
    let ch = convert(&state, ChanRef::new(HostType::INT64, 1).into()).unwrap();
    assert_eq!(state.index(&ch, &"peek".into()).unwrap(), ScriptValue::Nil);
}

#[test]
fn test_channel_identity() {
    let state = State::new();
    let chan = ChanRef::new(HostType::STRING, 0);
    let a = convert(&state, chan.clone().into()).unwrap();
    let b = convert(&state, chan.into()).unwrap();
    let c = convert(&state, ChanRef::new(HostType::STRING, 0).into()).unwrap();
    assert!(state.equals(&a, &b));
    assert!(!state.equals(&a, &c));
    assert!(state.to_string(&a).unwrap().starts_with("userdata: luar: chan string 0x"));
}

#[test]
fn test_script_receives_from_host_thread() {
    let state = State::new();
    let chan = ChanRef::new(HostType::STRING, 0);
    let ch = convert(&state, chan.clone().into()).unwrap();

    crossbeam::thread::scope(|s| {
        s.spawn(|_| {
            for word in ["hello", "from", "host"] {
                chan.send(word.into()).unwrap();
            }
            chan.close().unwrap();
        });

        let mut words = Vec::new();
        loop {
            let got = receive(&state, &ch);
            if got[1] == ScriptValue::Bool(false) {
                break;
            }
            words.push(got[0].as_str().unwrap().to_string());
        }
        assert_eq!(words, vec!["hello", "from", "host"]);
    })
    .unwrap();
}

#[test]
fn test_script_send_blocks_until_host_receives() {
    let state = State::new();
    let chan = ChanRef::new(HostType::INT64, 0);
    let ch = convert(&state, chan.clone().into()).unwrap();

    crossbeam::thread::scope(|s| {
        let receiver = s.spawn(|_| {
            let mut total = 0i64;
            while let Some(value) = chan.receive().unwrap() {
                if let HostValue::Int(_, n) = value {
                    total += n;
                }
            }
            total
        });

        for n in 1..=4 {
            state
                .call_method(&ch, "send", vec![ScriptValue::Number(n as f64)])
                .unwrap();
        }
        state.call_method(&ch, "close", vec![]).unwrap();
        assert_eq!(receiver.join().unwrap(), 10);
    })
    .unwrap();
}
