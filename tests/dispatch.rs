//! End-to-end tests over the full dispatch cycle: envelope in, state
//! threaded through the right module, commander and handler effects out,
//! with simulated channels standing in for the host backend.

use serde_json::{Value, json};

use port_funnel::modules::add_xy::{self, AddXy, AddXyMessage, AddXyState};
use port_funnel::modules::echo::{self, Echo, EchoMessage, EchoState};
use port_funnel::{
    Effect, EnvelopeError, FunnelError, FunnelModule, FunnelTable, Inbox, Response,
    SimulatedChannel, StateAccessor,
};

#[derive(Debug, Clone, Default, PartialEq)]
struct AppState {
    echo: EchoState,
    add_xy: AddXyState,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct AppModel {
    log: Vec<String>,
}

type Table = FunnelTable<AppState, AppModel, String>;

fn make_table(inbox: &Inbox) -> Table {
    let mut table = Table::new();
    table
        .register(
            Echo,
            StateAccessor::new(|s: &AppState| s.echo.clone(), |sub, s| s.echo = sub),
            Box::new(SimulatedChannel::new(Echo, echo::simulate, inbox.clone())),
            |response: &Response<EchoMessage>, _state, model: &mut AppModel| {
                model.log.push("echo handler".into());
                response
                    .messages()
                    .iter()
                    .filter_map(|m| match m {
                        EchoMessage::Request(s) => Some(format!("echo: {s}")),
                        EchoMessage::Startup => None,
                    })
                    .collect()
            },
        )
        .unwrap();
    table
        .register(
            AddXy,
            StateAccessor::new(|s: &AppState| s.add_xy.clone(), |sub, s| s.add_xy = sub),
            Box::new(SimulatedChannel::new(AddXy, add_xy::simulate, inbox.clone())),
            |response: &Response<AddXyMessage>, _state, model: &mut AppModel| {
                model.log.push("add_xy handler".into());
                response
                    .messages()
                    .iter()
                    .filter_map(|m| match m {
                        AddXyMessage::Sum { x, y, result } => Some(format!("{x}+{y}={result}")),
                        AddXyMessage::Product { x, y, result } => Some(format!("{x}*{y}={result}")),
                        _ => None,
                    })
                    .collect()
            },
        )
        .unwrap();
    table
}

/// Dispatch everything queued in the inbox, executing effects as the
/// application event loop would, until the system is quiescent.
fn drain(
    table: &Table,
    inbox: &Inbox,
    state: &mut AppState,
    model: &mut AppModel,
) -> Vec<String> {
    let mut surfaced = Vec::new();
    while let Some(wire) = inbox.pop() {
        let effects = table.dispatch(&wire, state, model).unwrap();
        surfaced.extend(table.perform(effects));
    }
    surfaced
}

#[test]
fn echo_request_updates_history_and_surfaces_message() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    let wire = json!({"module": "Echo", "tag": "request", "args": "hello"});
    let effects = table.dispatch(&wire, &mut state, &mut model).unwrap();

    assert_eq!(state.echo.history, ["hello"]);
    assert_eq!(model.log, ["echo handler"]);
    assert_eq!(effects, vec![Effect::App("echo: hello".to_string())]);
}

#[test]
fn dollar_request_emits_exactly_one_command_send() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    let wire = Echo.encode(&EchoMessage::Request("$abc".into())).to_wire();
    let effects = table.dispatch(&wire, &mut state, &mut model).unwrap();

    // Commander effect first, application effect after.
    assert_eq!(
        effects,
        vec![
            Effect::Send {
                module: "Echo".into(),
                wire: Echo.encode(&EchoMessage::Request("abc".into())).to_wire(),
            },
            Effect::App("echo: $abc".to_string()),
        ]
    );
}

#[test]
fn unknown_module_is_reported_and_nothing_changes() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    let err = table
        .dispatch(&json!({"module": "Bogus", "tag": "x", "args": null}), &mut state, &mut model)
        .unwrap_err();

    assert_eq!(err, FunnelError::UnknownModule("Bogus".into()));
    assert_eq!(state, AppState::default());
    assert_eq!(model, AppModel::default());
}

#[test]
fn malformed_envelope_names_missing_field_and_nothing_changes() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    let err = table
        .dispatch(&json!({"module": "Echo"}), &mut state, &mut model)
        .unwrap_err();

    assert_eq!(err, FunnelError::Envelope(EnvelopeError::MissingField("tag")));
    assert_eq!(state, AppState::default());
    assert_eq!(model, AppModel::default());
}

#[test]
fn rejected_message_leaves_state_untouched() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    state.echo.history.push("existing".into());
    let before = state.clone();
    let mut model = AppModel::default();

    let err = table
        .dispatch(
            &json!({"module": "Echo", "tag": "request", "args": 5}),
            &mut state,
            &mut model,
        )
        .unwrap_err();

    match err {
        FunnelError::Message { module, .. } => assert_eq!(module, "Echo"),
        other => panic!("expected message decode error, got {other:?}"),
    }
    assert_eq!(state, before);
    assert_eq!(model, AppModel::default());
}

#[test]
fn simulated_add_answers_on_a_later_turn() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    table.send(&AddXy, &AddXyMessage::Add { x: 2, y: 3 }).unwrap();

    // The send itself dispatches nothing: the answer sits queued as a
    // separate inbound event.
    assert_eq!(inbox.len(), 1);
    assert_eq!(state, AppState::default());

    let surfaced = drain(&table, &inbox, &mut state, &mut model);
    assert_eq!(surfaced, ["2+3=5"]);
    assert_eq!(
        state.add_xy.history,
        [AddXyMessage::Sum { x: 2, y: 3, result: 5 }]
    );
}

#[test]
fn simulate_none_delivers_nothing() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);

    table.send(&Echo, &EchoMessage::Startup).unwrap();
    assert!(inbox.is_empty());
}

#[test]
fn startup_is_a_noop_response_but_handler_still_runs() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    let wire = json!({"module": "Echo", "tag": "startup", "args": null});
    let effects = table.dispatch(&wire, &mut state, &mut model).unwrap();

    assert!(effects.is_empty());
    assert!(state.echo.was_loaded);
    assert_eq!(model.log, ["echo handler"]);
}

#[test]
fn command_chain_drains_to_quiescence() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    // "$$x" echoes, re-sends "$x", which echoes and re-sends "x".
    table.send(&Echo, &EchoMessage::Request("$$x".into())).unwrap();
    let surfaced = drain(&table, &inbox, &mut state, &mut model);

    assert_eq!(surfaced, ["echo: $$x", "echo: $x", "echo: x"]);
    assert_eq!(state.echo.history, ["x", "$x", "$$x"]);
    assert_eq!(model.log.len(), 3);
}

#[test]
fn batch_effects_match_individual_dispatch() {
    // A batch of N responses must produce exactly the effects of its parts,
    // concatenated. Observed through the commander: two `$` requests in
    // sequence vs. their commands collected one at a time.
    let batch: Response<EchoMessage> = Response::Batch(vec![
        Response::Message(EchoMessage::Request("a".into())),
        Response::Batch(vec![
            Response::Command(EchoMessage::Request("b".into())),
            Response::Command(EchoMessage::Request("c".into())),
        ]),
        Response::None,
    ]);
    let individual: Vec<Response<EchoMessage>> = vec![
        Response::Message(EchoMessage::Request("a".into())),
        Response::Command(EchoMessage::Request("b".into())),
        Response::Command(EchoMessage::Request("c".into())),
        Response::None,
    ];

    let flat: Vec<_> = individual.iter().flat_map(|r| r.commands()).collect();
    assert_eq!(batch.commands(), flat);
    let flat: Vec<_> = individual.iter().flat_map(|r| r.messages()).collect();
    assert_eq!(batch.messages(), flat);
}

#[test]
fn mixed_modules_share_one_inbox() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    table.send(&Echo, &EchoMessage::Request("hi".into())).unwrap();
    table.send(&AddXy, &AddXyMessage::Multiply { x: 4, y: 5 }).unwrap();

    let surfaced = drain(&table, &inbox, &mut state, &mut model);
    assert_eq!(surfaced, ["echo: hi", "4*5=20"]);
    assert_eq!(state.echo.history, ["hi"]);
    assert_eq!(
        state.add_xy.history,
        [AddXyMessage::Product { x: 4, y: 5, result: 20 }]
    );
}

#[test]
fn perform_routes_send_effects_through_the_channel() {
    let inbox = Inbox::new();
    let table = make_table(&inbox);
    let mut state = AppState::default();
    let mut model = AppModel::default();

    let wire = Echo.encode(&EchoMessage::Request("$abc".into())).to_wire();
    let effects = table.dispatch(&wire, &mut state, &mut model).unwrap();
    let app = table.perform(effects);

    assert_eq!(app, ["echo: $abc"]);
    // The command went to the simulator, which queued the echoed reply.
    let queued: Vec<Value> = std::iter::from_fn(|| inbox.pop()).collect();
    assert_eq!(
        queued,
        [Echo.encode(&EchoMessage::Request("abc".into())).to_wire()]
    );
}
