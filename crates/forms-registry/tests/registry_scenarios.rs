// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end registry scenarios: create, grant, submit, query.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use forms_registry::{
    encode, Address, ManualClock, Question, Registry, RegistryError, RegistryEvent, ResponseType,
    ResponseValue, Timestamp,
};

fn owner() -> Address {
    Address::from_low_u64(0xA11CE)
}

fn responder() -> Address {
    Address::from_low_u64(0xB0B)
}

fn stranger() -> Address {
    Address::from_low_u64(0xBAD)
}

fn fresh() -> (Registry<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp(1_700_000_000_000)));
    (Registry::with_clock(owner(), Arc::clone(&clock)), clock)
}

fn numeric(n: u64) -> Vec<u8> {
    encode(&ResponseValue::Numeric(n), ResponseType::Numeric).unwrap()
}

#[test]
fn create_question_grant_submit() {
    let (mut reg, _) = fresh();

    let form = reg.create_form(&owner(), "Test Form", "desc").unwrap();
    assert_eq!(form, 1);

    let q = reg
        .add_question_to_form(
            &owner(),
            form,
            Question::new("Q1", "D1", true, ResponseType::Numeric),
        )
        .unwrap();
    assert_eq!(q, 0);

    reg.add_responder(&owner(), form, responder()).unwrap();
    assert!(reg.is_allowed_responder(1, &responder()));

    reg.submit_response(&responder(), form, q, &numeric(46))
        .unwrap();
    let history = reg.response_history(1, 0).unwrap();
    assert_eq!(history.responses, vec![ResponseValue::Numeric(46)]);
    assert_eq!(history.timestamps.len(), 1);
}

#[test]
fn repeated_submissions_accumulate_in_order() {
    let (mut reg, clock) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "desc").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Q1", "D1", true, ResponseType::Numeric),
    )
    .unwrap();
    reg.add_responder(&owner(), form, responder()).unwrap();

    reg.submit_response(&responder(), form, 0, &numeric(24))
        .unwrap();
    clock.advance(1_000);
    reg.submit_response(&responder(), form, 0, &numeric(36))
        .unwrap();

    let history = reg.response_history(form, 0).unwrap();
    assert_eq!(
        history.responses,
        vec![ResponseValue::Numeric(24), ResponseValue::Numeric(36)]
    );
    assert!(history.timestamps[0] < history.timestamps[1]);
}

#[test]
fn text_answers_round_trip_through_history() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Question 1", "Describe question 1", false, ResponseType::Text),
    )
    .unwrap();
    reg.add_responders(&owner(), form, &[responder(), stranger()])
        .unwrap();

    for answer in ["Answer 1", "Answer 2", "Answer 3"] {
        reg.submit_response(&responder(), form, 0, answer.as_bytes())
            .unwrap();
    }
    let history = reg.response_history(form, 0).unwrap();
    assert_eq!(
        history.responses,
        vec![
            ResponseValue::from("Answer 1"),
            ResponseValue::from("Answer 2"),
            ResponseValue::from("Answer 3"),
        ]
    );
}

#[test]
fn all_forms_lists_in_creation_order() {
    let (mut reg, _) = fresh();
    for title in ["first", "second", "third"] {
        reg.create_form(&owner(), title, "").unwrap();
    }
    let forms = reg.all_forms();
    assert_eq!(forms.len(), 3);
    let ids: Vec<u64> = forms.iter().map(|f| f.id).collect();
    let titles: Vec<&str> = forms.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(titles, vec!["first", "second", "third"]);
}

#[test]
fn form_and_question_details() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "about").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Question 1", "Describe question 1", true, ResponseType::Numeric),
    )
    .unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Question 2", "Describe question 2", false, ResponseType::Text),
    )
    .unwrap();

    let details = reg.form_details(form).unwrap();
    assert_eq!(details.title, "Test Form");
    assert_eq!(details.description, "about");
    assert_eq!(details.questions_count, 2);
    assert_eq!(details.questions.len(), 2);

    let q1 = reg.question_details(form, 1).unwrap();
    assert_eq!(q1.id, 1);
    assert_eq!(q1.title, "Question 2");
    assert!(!q1.required);
    assert_eq!(q1.response_type, ResponseType::Text);

    assert_eq!(
        reg.question_details(form, 2).unwrap_err(),
        RegistryError::InvalidQuestionIndex {
            form_id: form,
            index: 2,
            count: 2
        }
    );
    assert_eq!(
        reg.form_details(7).unwrap_err(),
        RegistryError::FormNotFound(7)
    );
}

#[test]
fn unauthorized_responder_is_rejected_regardless_of_index() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Q", "", false, ResponseType::Text),
    )
    .unwrap();

    for index in [0, 1, 99] {
        let err = reg
            .submit_response(&stranger(), form, index, b"Answer 1")
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotAllowedResponder {
                form_id: form,
                caller: stranger()
            }
        );
    }
}

#[test]
fn out_of_range_index_is_rejected_for_allowed_responder() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "").unwrap();
    for i in 0..2 {
        reg.add_question_to_form(
            &owner(),
            form,
            Question::new(format!("Question {i}"), "", false, ResponseType::Text),
        )
        .unwrap();
    }
    reg.add_responders(&owner(), form, &[responder()]).unwrap();
    let err = reg
        .submit_response(&responder(), form, 2, b"Answer 1")
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidQuestionIndex");
}

#[test]
fn non_owner_mutations_leave_state_unchanged() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "").unwrap();
    let before = reg.snapshot();

    assert_eq!(
        reg.create_form(&stranger(), "x", "").unwrap_err(),
        RegistryError::NotOwner { caller: stranger() }
    );
    assert_eq!(
        reg.add_question_to_form(
            &stranger(),
            form,
            Question::new("q", "", true, ResponseType::Numeric)
        )
        .unwrap_err()
        .kind(),
        "NotOwner"
    );
    assert_eq!(
        reg.add_responders(&stranger(), form, &[stranger()])
            .unwrap_err()
            .kind(),
        "NotOwner"
    );
    assert_eq!(reg.snapshot(), before);
}

#[test]
fn histories_are_shared_but_filterable_per_responder() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form", "").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Q", "", false, ResponseType::Text),
    )
    .unwrap();
    reg.add_responders(&owner(), form, &[responder(), stranger()])
        .unwrap();

    reg.submit_response(&responder(), form, 0, b"mine").unwrap();
    reg.submit_response(&stranger(), form, 0, b"theirs").unwrap();
    reg.submit_response(&responder(), form, 0, b"mine again")
        .unwrap();

    assert_eq!(reg.response_history(form, 0).unwrap().len(), 3);
    let mine = reg.responses_by(form, 0, &responder()).unwrap();
    assert_eq!(
        mine.responses,
        vec![ResponseValue::from("mine"), ResponseValue::from("mine again")]
    );
}

#[test]
fn opaque_questions_accept_any_payload() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Blobs", "").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Attachment", "", false, ResponseType::Opaque(9)),
    )
    .unwrap();
    reg.add_responder(&owner(), form, responder()).unwrap();
    reg.submit_response(&responder(), form, 0, &[0xff, 0x00])
        .unwrap();
    assert_eq!(
        reg.response_history(form, 0).unwrap().responses,
        vec![ResponseValue::Opaque(vec![0xff, 0x00])]
    );
}

#[test]
fn event_log_recovers_generated_identifiers() {
    let (mut reg, _) = fresh();
    let form = reg.create_form(&owner(), "Test Form2", "").unwrap();
    reg.add_question_to_form(
        &owner(),
        form,
        Question::new("Q", "", false, ResponseType::Text),
    )
    .unwrap();
    reg.add_responder(&owner(), form, responder()).unwrap();
    reg.submit_response(&responder(), form, 0, b"a").unwrap();

    let names: Vec<&str> = reg.events().iter().map(|r| r.event.name()).collect();
    assert_eq!(
        names,
        vec![
            "FormCreated",
            "QuestionCreated",
            "ResponderAdded",
            "ResponseSubmitted"
        ]
    );
    let created = reg.events().last_named("FormCreated").expect("form event");
    assert_eq!(created.event, RegistryEvent::FormCreated { form_id: form });
    let question = reg
        .events()
        .last_named("QuestionCreated")
        .expect("question event");
    assert_eq!(
        question.event,
        RegistryEvent::QuestionCreated {
            form_id: form,
            question_index: 0
        }
    );
}
