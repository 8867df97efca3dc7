//! Routing parser totality tests
//!
//! The parser must accept every string without panicking and always
//! produce a non-empty, valid command batch.

use orion_assistant::{Module, parse_routing};

#[test]
fn malformed_input_yields_exact_fallback() {
    let commands = parse_routing("not a list");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].module, Module::Chatbot);
    assert_eq!(commands[0].query, "Sorry, I couldn't understand that.");
}

#[test]
fn totality_over_hostile_inputs() {
    let inputs = [
        "",
        "   ",
        "[",
        "]",
        "[[",
        "[]",
        "[[]]",
        "['a']",
        "['a', 'b', 'c']",
        "[['a', 'b'], oops]",
        "prose before [['CHATBOT', 'x']]",
        "[['CHATBOT', 'x']] prose after",
        "[['CHATBOT', 'unterminated]",
        "[[42, 'x']]",
        "{'CHATBOT': 'x'}",
        "\\",
        "'",
        "[['a' 'b']]",
        "🤖",
    ];

    for input in inputs {
        let commands = parse_routing(input);
        assert!(!commands.is_empty(), "empty batch for {input:?}");
        // Hostile input must land on the fallback, not a partial parse
        assert_eq!(commands[0].module, Module::Chatbot, "input {input:?}");
    }
}

#[test]
fn single_line_model_output_parses() {
    let raw = "[['CHATBOT', \"What's the weather in Karachi and open Notion\"], \
               ['WEATHER', 'Weather in Karachi'], ['SYSTEM_COMMANDS', 'Open Notion']]";
    let commands = parse_routing(raw);

    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0].module, Module::Chatbot);
    assert_eq!(commands[1].module, Module::Weather);
    assert_eq!(commands[1].query, "Weather in Karachi");
    assert_eq!(commands[2].module, Module::SystemCommands);
}

#[test]
fn multiline_output_parses() {
    let raw = "[\n    ['SEARCH', 'Moon landing'],\n    ['SEARCH', 'Elon Musk']\n]";
    let commands = parse_routing(raw);
    assert_eq!(commands.len(), 2);
    assert!(commands.iter().all(|c| c.module == Module::Search));
}

#[test]
fn missing_outer_brackets_are_restored() {
    let commands = parse_routing("['Exit', 'Exit']");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].module, Module::Exit);
}

#[test]
fn unknown_tags_become_unrecognized_not_failures() {
    let commands = parse_routing("[['FLUX_CAPACITOR', 'engage']]");
    assert_eq!(commands.len(), 1);
    assert_eq!(
        commands[0].module,
        Module::Unrecognized("FLUX_CAPACITOR".to_string())
    );
    assert_eq!(commands[0].query, "engage");
}

#[test]
fn order_is_preserved_without_deduplication() {
    let raw = "[['SEARCH', 'a'], ['SEARCH', 'a'], ['WEATHER', 'b']]";
    let commands = parse_routing(raw);

    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0].query, "a");
    assert_eq!(commands[1].query, "a");
    assert_eq!(commands[2].module, Module::Weather);
}
