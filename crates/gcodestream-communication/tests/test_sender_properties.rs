//! Property tests for the sender invariants

use gcodestream_communication::{ProgramContext, ProgramState, Sender};
use gcodestream_core::{EventFilter, ProtocolKind, SenderEvent, SenderOptions};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Next,
    Ack,
    SetBufferSize(usize),
    Hold,
    Unhold,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => Just(Op::Next),
        6 => Just(Op::Ack),
        1 => (0usize..300).prop_map(Op::SetBufferSize),
        1 => Just(Op::Hold),
        1 => Just(Op::Unhold),
    ]
}

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "G[0-3] X[0-9]{1,3}\\.[0-9]{3} Y[0-9]{1,3}\\.[0-9]{3}",
        1 => "M[0-9]{1,2}",
        1 => "[ \t]{0,4}",
        1 => Just(String::new()),
    ]
}

fn program_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(line_strategy(), 1..60),
        prop_oneof![Just("\n"), Just("\r\n")],
    )
        .prop_map(|(lines, sep)| lines.join(sep))
}

fn protocol_strategy() -> impl Strategy<Value = Option<ProtocolKind>> {
    prop_oneof![
        Just(None),
        Just(Some(ProtocolKind::SendResponse)),
        Just(Some(ProtocolKind::CharCounting)),
    ]
}

fn count_events(sender: &Sender) -> Arc<Mutex<usize>> {
    let ends = Arc::new(Mutex::new(0usize));
    let counter = ends.clone();
    sender.on(EventFilter::All, move |event| {
        if event == SenderEvent::End {
            *counter.lock() += 1;
        }
    });
    ends
}

proptest! {
    #[test]
    fn prop_total_counts_non_blank_lines(content in program_strategy()) {
        let expected = content
            .split(['\n', '\r'])
            .filter(|line| !line.trim().is_empty())
            .count();

        let mut sender = Sender::new(None, SenderOptions::default());
        let loaded = sender.load("prop.nc", &content, ProgramContext::new());

        prop_assert_eq!(loaded, expected > 0);
        if loaded {
            prop_assert_eq!(sender.state().total, expected);
            prop_assert_eq!(sender.state().lines.len(), expected);
            prop_assert!(sender.state().lines.iter().all(|l| l.trim() == l && !l.is_empty()));
        }
    }

    #[test]
    fn prop_counters_and_capacity_hold_under_any_interleaving(
        content in program_strategy(),
        kind in protocol_strategy(),
        buffer_size in 1i64..300,
        ops in prop::collection::vec(op_strategy(), 0..400),
    ) {
        let mut sender = Sender::new(kind, SenderOptions::default().with_buffer_size(buffer_size));
        let ends = count_events(&sender);
        if !sender.load("prop.nc", &content, ProgramContext::new()) {
            return Ok(());
        }

        for op in ops {
            match op {
                Op::Next => { sender.next(); }
                Op::Ack => { sender.ack(); }
                Op::SetBufferSize(n) => { sender.set_buffer_size(n); }
                Op::Hold => { sender.hold(None); }
                Op::Unhold => { sender.unhold(); }
            }

            let state = sender.state();
            prop_assert!(state.received <= state.sent);
            prop_assert!(state.sent <= state.total);
            prop_assert_eq!(state.total, state.lines.len());

            if let Some(sp) = sender.protocol().as_char_counting() {
                prop_assert_eq!(sp.data_length(), sp.queue().iter().sum::<usize>());
                prop_assert!(sp.data_length() <= sp.buffer_size());
                prop_assert_eq!(sp.queue().len(), state.sent - state.received);
            }

            prop_assert!(*ends.lock() <= 1);
            if *ends.lock() == 1 {
                prop_assert!(sender.state().is_complete());
            }
        }
    }

    #[test]
    fn prop_drain_then_unload_restores_defaults(
        content in program_strategy(),
        kind in protocol_strategy(),
    ) {
        let mut sender = Sender::new(kind, SenderOptions::default());
        let ends = count_events(&sender);
        if !sender.load("prop.nc", &content, ProgramContext::new()) {
            return Ok(());
        }

        // Short lines always fit the default buffer, so this always drains
        let total = sender.state().total;
        for _ in 0..(total * 2 + 2) {
            sender.next();
            while sender.ack() {}
        }

        prop_assert!(sender.state().is_complete());
        prop_assert_eq!(*ends.lock(), 1);
        prop_assert!(sender.state().finish_time >= sender.state().start_time);

        sender.unload();
        prop_assert_eq!(sender.state(), &ProgramState::unloaded());
    }
}
