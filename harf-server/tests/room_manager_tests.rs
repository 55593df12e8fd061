
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use harf_persistence::RoundRepository;
use sea_orm::ConnectionTrait;
use harf_server::websocket::connection::ConnectionId;
use harf_types::{AnswerStatus, Category, RoomError, ServerMessage};
use test_helpers::*;

#[tokio::test]
async fn test_room_creation_seats_the_host() {
    let setup = TestRoomSetup::new().await;

    let (room, host, _) = setup.create_room_with_players("ليلى", &[]).await;

    assert_eq!(room.code.len(), 4);
    assert_eq!(room.code, room.code.to_uppercase());
    assert!(host.is_host);
    assert_eq!(host.room_id, room.id);

    let players = setup.room_manager.list_players(room.id).await.unwrap();
    assert_eq!(players.len(), 1);
}

#[tokio::test]
async fn test_joining_an_unknown_code_fails() {
    let setup = TestRoomSetup::new().await;

    let result = setup.room_manager.join_room("ZZZZ", "منى").await;
    assert_eq!(result.unwrap_err(), RoomError::RoomNotFound);
}

#[tokio::test]
async fn test_blank_player_names_are_rejected() {
    let setup = TestRoomSetup::new().await;

    let result = setup.room_manager.create_room("   ").await;
    assert!(matches!(
        result.unwrap_err(),
        RoomError::InvalidSubmission { .. }
    ));
}

#[tokio::test]
async fn test_only_the_host_starts_rounds() {
    let setup = TestRoomSetup::new().await;
    let (room, _host, guests) = setup.create_room_with_players("أحمد", &["منى"]).await;

    let result = setup.room_manager.start_round(room.id, guests[0].id).await;
    assert_eq!(result.unwrap_err(), RoomError::NotHost);
}

#[tokio::test]
async fn test_concurrent_starts_yield_one_round() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let (first, second) = tokio::join!(
        setup.room_manager.start_round(room.id, host.id),
        setup.room_manager.start_round(room.id, host.id),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let conflict = results.iter().find(|r| r.is_err()).unwrap();
    assert_eq!(
        conflict.as_ref().unwrap_err(),
        &RoomError::RoundAlreadyActive
    );

    // Exactly one round is active in storage.
    let active = setup.room_manager.active_round(room.id).await.unwrap();
    assert!(active.is_some());
}

#[tokio::test]
async fn test_shared_words_score_five_each() {
    let setup = TestRoomSetup::new().await;
    let (room, host, guests) = setup.create_room_with_players("أحمد", &["منى"]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    // Both players answer the round letter itself, so their words are
    // identical whatever letter was drawn.
    let word = round.letter.clone();
    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Animal, &word),
            false,
        )
        .await
        .unwrap();
    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            guests[0].id,
            &single_entry(Category::Animal, &word),
            false,
        )
        .await
        .unwrap();

    let scoreboard = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();

    assert_eq!(scoreboard.len(), 2);
    assert!(scoreboard.iter().all(|entry| entry.total_points == 5));
}

#[tokio::test]
async fn test_unique_words_score_ten() {
    let setup = TestRoomSetup::new().await;
    let (room, host, guests) = setup.create_room_with_players("أحمد", &["منى"]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    // Different words on the same letter: one and two characters.
    let short = round.letter.clone();
    let long = round.letter.repeat(2);
    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Plant, &short),
            false,
        )
        .await
        .unwrap();
    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            guests[0].id,
            &single_entry(Category::Plant, &long),
            false,
        )
        .await
        .unwrap();

    let scoreboard = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();

    assert!(scoreboard.iter().all(|entry| entry.total_points == 10));
}

#[tokio::test]
async fn test_invalid_answers_still_create_score_rows() {
    // Oracle says no and the dictionary is empty, so nothing validates.
    let setup = TestRoomSetup::with_oracle(false).await;
    let (room, host, _) = setup.create_room_with_players("سارة", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    let answers = setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Country, &round.letter),
            false,
        )
        .await
        .unwrap();
    assert_eq!(answers[0].status, AnswerStatus::Invalid);

    let scoreboard = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();

    assert_eq!(scoreboard.len(), 1);
    assert_eq!(scoreboard[0].total_points, 0);
}

#[tokio::test]
async fn test_wrong_letter_answers_are_graded_invalid() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("سارة", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    // No letter in the alphabet maps to "x", so the letter check fails
    // regardless of the draw.
    let answers = setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Name, "x"),
            false,
        )
        .await
        .unwrap();

    assert_eq!(answers[0].status, AnswerStatus::Invalid);
}

#[tokio::test]
async fn test_duplicate_category_rejects_the_whole_batch() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Animal, &round.letter),
            false,
        )
        .await
        .unwrap();

    // Resubmit the answered category together with a fresh one.
    let mut entries = HashMap::new();
    entries.insert(Category::Animal, round.letter.clone());
    entries.insert(Category::Plant, round.letter.clone());

    let result = setup
        .room_manager
        .submit_answers(room.id, round.id, host.id, &entries, false)
        .await;
    assert_eq!(
        result.unwrap_err(),
        RoomError::DuplicateAnswer {
            category: "animal".to_string()
        }
    );

    // The fresh category was not inserted either.
    let rounds = RoundRepository::new(setup.db.clone());
    let stored = rounds.answers_for_round(round.id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_empty_submissions_are_rejected() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    let result = setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Animal, "   "),
            false,
        )
        .await;

    assert!(matches!(
        result.unwrap_err(),
        RoomError::InvalidSubmission { .. }
    ));
}

#[tokio::test]
async fn test_submitting_to_an_ended_round_fails() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();
    setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();

    let result = setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Animal, &round.letter),
            false,
        )
        .await;
    assert_eq!(result.unwrap_err(), RoomError::RoundNotFound);
}

#[tokio::test]
async fn test_outsiders_cannot_submit() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;
    let (_, other_host, _) = setup.create_room_with_players("منى", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    // A player from another room, and a made-up player id.
    for player_id in [other_host.id, Uuid::new_v4()] {
        let result = setup
            .room_manager
            .submit_answers(
                room.id,
                round.id,
                player_id,
                &single_entry(Category::Animal, &round.letter),
                false,
            )
            .await;
        assert_eq!(result.unwrap_err(), RoomError::PlayerNotFound);
    }
}

#[tokio::test]
async fn test_ending_twice_scores_once() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();
    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Object, &round.letter),
            false,
        )
        .await
        .unwrap();

    let first = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();
    assert_eq!(first[0].total_points, 10);

    // A duplicate end signal does not re-apply the round's points.
    let second = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();
    assert_eq!(second[0].total_points, 10);
}

#[tokio::test]
async fn test_finish_flag_ends_the_round_after_grading() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Country, &round.letter),
            true,
        )
        .await
        .unwrap();

    assert!(setup
        .room_manager
        .active_round(room.id)
        .await
        .unwrap()
        .is_none());

    let scoreboard = setup.room_manager.scoreboard(room.id).await.unwrap();
    assert_eq!(scoreboard[0].total_points, 10);
}

#[tokio::test]
async fn test_answers_pending_at_round_end_count_invalid() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    // Insert a raw pending answer, as if grading never finished.
    let rounds = RoundRepository::new(setup.db.clone());
    rounds
        .insert_answer(round.id, host.id, Category::Animal, &round.letter)
        .await
        .unwrap();

    let scoreboard = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();
    assert_eq!(scoreboard[0].total_points, 0);

    let stored = rounds.answers_for_round(round.id).await.unwrap();
    assert_eq!(stored[0].status, AnswerStatus::Invalid);
}

#[tokio::test]
async fn test_scores_accumulate_across_rounds() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    for expected_number in 1..=2 {
        let round = setup
            .room_manager
            .start_round(room.id, host.id)
            .await
            .unwrap();
        assert_eq!(round.round_number, expected_number);

        setup
            .room_manager
            .submit_answers(
                room.id,
                round.id,
                host.id,
                &single_entry(Category::Name, &round.letter),
                true,
            )
            .await
            .unwrap();
    }

    let scoreboard = setup.room_manager.scoreboard(room.id).await.unwrap();
    assert_eq!(scoreboard[0].total_points, 20);
}

#[tokio::test]
async fn test_overdue_rounds_are_force_ended() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("أحمد", &[]).await;

    setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    // Zero cap: every active round is overdue.
    setup
        .room_manager
        .finish_overdue_rounds(Duration::ZERO)
        .await;

    assert!(setup
        .room_manager
        .active_round(room.id)
        .await
        .unwrap()
        .is_none());
    // The round ended through the normal path, scoring included.
    let scoreboard = setup.room_manager.scoreboard(room.id).await.unwrap();
    assert_eq!(scoreboard.len(), 1);
}

#[tokio::test]
async fn test_failed_end_keeps_the_round_active() {
    let setup = TestRoomSetup::new().await;
    let (room, host, _) = setup.create_room_with_players("سارة", &[]).await;
    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();

    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Name, &round.letter),
            false,
        )
        .await
        .unwrap();

    // Take the rounds table away, so stamping the end time fails.
    setup
        .db
        .execute_unprepared("ALTER TABLE rounds RENAME TO rounds_missing")
        .await
        .unwrap();
    let result = setup.room_manager.end_round(room.id, round.id).await;
    assert!(matches!(result, Err(RoomError::Storage { .. })));
    setup
        .db
        .execute_unprepared("ALTER TABLE rounds_missing RENAME TO rounds")
        .await
        .unwrap();

    // The round is still the single active round, so a second start
    // conflicts instead of stacking another open round on top.
    let result = setup.room_manager.start_round(room.id, host.id).await;
    assert_eq!(result.unwrap_err(), RoomError::RoundAlreadyActive);
    let active = setup
        .room_manager
        .active_round(room.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, round.id);

    // A retried end signal finishes and scores the round normally.
    let scoreboard = setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();
    assert_eq!(scoreboard[0].total_points, 10);
    assert!(setup
        .room_manager
        .active_round(room.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_overdue_sweep_covers_rounds_from_before_a_restart() {
    let setup = TestRoomSetup::new().await;
    let (room, _host, _) = setup.create_room_with_players("أحمد", &[]).await;

    // A round left open by a previous process: it exists in storage
    // only, and no sequencer has seen it yet.
    let rounds = RoundRepository::new(setup.db.clone());
    let round = rounds
        .create_round(Uuid::new_v4(), room.id, 1, 'ق')
        .await
        .unwrap();

    setup
        .room_manager
        .finish_overdue_rounds(Duration::ZERO)
        .await;

    let stored = rounds.find_by_id(round.id).await.unwrap().unwrap();
    assert!(!stored.is_active());
    // Scoring ran: the room's player got a score row.
    let scoreboard = setup.room_manager.scoreboard(room.id).await.unwrap();
    assert_eq!(scoreboard.len(), 1);
}

#[tokio::test]
async fn test_round_events_reach_room_watchers() {
    let setup = TestRoomSetup::new().await;
    let (room, host, guests) = setup.create_room_with_players("أحمد", &["منى"]).await;

    let conn_id = ConnectionId::new();
    let mut receiver = setup.connection_manager.create_connection(conn_id).await;
    setup
        .connection_manager
        .watch_room(conn_id, room.id, guests[0].id)
        .await;

    let round = setup
        .room_manager
        .start_round(room.id, host.id)
        .await
        .unwrap();
    match receiver.try_recv().unwrap() {
        ServerMessage::RoundStarted { round: started } => assert_eq!(started.id, round.id),
        other => panic!("Expected RoundStarted, got: {:?}", other),
    }

    setup
        .room_manager
        .submit_answers(
            room.id,
            round.id,
            host.id,
            &single_entry(Category::Animal, &round.letter),
            false,
        )
        .await
        .unwrap();
    match receiver.try_recv().unwrap() {
        ServerMessage::AnswerGraded { answer } => {
            assert_eq!(answer.player_id, host.id);
            assert_eq!(answer.status, AnswerStatus::Valid);
        }
        other => panic!("Expected AnswerGraded, got: {:?}", other),
    }

    setup
        .room_manager
        .end_round(room.id, round.id)
        .await
        .unwrap();
    match receiver.try_recv().unwrap() {
        ServerMessage::RoundEnded { round_id, .. } => assert_eq!(round_id, round.id),
        other => panic!("Expected RoundEnded, got: {:?}", other),
    }
}
