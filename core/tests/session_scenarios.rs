//! End-to-end scenarios driving `SessionConverter` against the scripted
//! engine, the way a session layer would between key events.

use std::sync::Arc;

use libkana_core::converter::{mock_segment, MockConverter};
use libkana_core::key_event::KeyEvent;
use libkana_core::session_converter::{
    InputContext, SessionConverter, SessionState, CONSUMED_ALL_CHARACTERS,
};
use libkana_core::settings::Settings;
use libkana_core::stats::UsageStats;
use libkana_core::table::Table;
use libkana_core::{Composer, Config, Converter, Output};

fn romaji_table() -> Arc<Table> {
    let mut table = Table::new();
    for (input, output) in [
        ("a", "あ"),
        ("i", "い"),
        ("u", "う"),
        ("ka", "か"),
        ("ma", "ま"),
        ("bo", "ぼ"),
        ("ko", "こ"),
        ("no", "の"),
        ("mo", "も"),
        ("n", "ん"),
        ("nn", "ん"),
        ("na", "な"),
        ("ni", "に"),
    ] {
        table.add_rule(input, output, "");
    }
    Arc::new(table)
}

struct Session {
    converter: Arc<MockConverter>,
    stats: Arc<UsageStats>,
    settings: Arc<Settings>,
    session: SessionConverter,
    composer: Composer,
}

impl Session {
    fn new() -> Self {
        let config = Arc::new(Config::default());
        let converter = Arc::new(MockConverter::new());
        let stats = Arc::new(UsageStats::new());
        let settings = Arc::new(Settings::new());
        let session = SessionConverter::new(
            Arc::clone(&converter) as Arc<dyn Converter>,
            Arc::clone(&config),
            Arc::clone(&stats),
            Arc::clone(&settings),
        );
        let composer = Composer::new(romaji_table(), config);
        Session {
            converter,
            stats,
            settings,
            session,
            composer,
        }
    }

    fn type_keys(&mut self, keys: &str) {
        for c in keys.chars() {
            self.composer.insert_character_key_event(&KeyEvent::from_char(c));
        }
    }
}

#[test]
fn test_type_convert_focus_commit() {
    let mut s = Session::new();
    s.converter.set_conversion(
        "かまぼこのいんぼう",
        vec![
            mock_segment("かまぼこの", &["蒲鉾の", "かまぼこの"]),
            mock_segment("いんぼう", &["陰謀", "いんぼう"]),
        ],
    );
    s.type_keys("kamabokonoinnbou");
    assert_eq!(s.composer.query_for_conversion(), "かまぼこのいんぼう");

    assert!(s.session.convert(&s.composer));
    match s.session.pop_output(&s.composer) {
        Some(Output::Preedit(preedit)) => {
            assert_eq!(preedit.text(), "蒲鉾の陰謀");
            assert_eq!(preedit.highlighted_position, Some(0));
        }
        other => panic!("expected conversion preedit, got {other:?}"),
    }

    // Focus the second segment and pick its second candidate.
    s.session.segment_focus_right();
    s.session.candidate_next(&s.composer);
    match s.session.pop_output(&s.composer) {
        Some(Output::Candidates(window)) => {
            assert_eq!(window.position, 3);
            assert_eq!(window.focused_index, Some(1));
        }
        other => panic!("expected candidate window, got {other:?}"),
    }

    s.session.commit(&s.composer);
    match s.session.pop_output(&s.composer) {
        Some(Output::Result(result)) => {
            assert_eq!(result.value, "蒲鉾のいんぼう");
            assert_eq!(result.key, "かまぼこのいんぼう");
        }
        other => panic!("expected result, got {other:?}"),
    }
    assert_eq!(s.stats.count("Commit"), 1);
    assert_eq!(s.stats.count("CommitFromConversion"), 1);
    assert_eq!(s.stats.count("ConversionCandidates0"), 1);
    assert_eq!(s.stats.count("ConversionCandidates1"), 1);
    assert_eq!(s.converter.finish_count(), 1);
}

#[test]
fn test_suggestion_to_prediction_commit() {
    let mut s = Session::new();
    s.converter
        .set_suggestion("も", vec![mock_segment("も", &["もずくす"])]);
    s.converter.set_prediction(
        "も",
        vec![mock_segment("も", &["もずく", "森", "もしもし"])],
    );

    s.type_keys("mo");
    assert!(s.session.suggest(&s.composer));
    match s.session.pop_output(&s.composer) {
        Some(Output::Candidates(window)) => {
            // Suggestions have no focus and no selection shortcuts.
            assert_eq!(window.focused_index, None);
            assert_eq!(window.candidates[0].shortcut, None);
        }
        other => panic!("expected suggestion window, got {other:?}"),
    }

    assert!(s.session.predict(&s.composer));
    assert_eq!(s.session.state(), SessionState::Prediction);
    let consumed = s.session.commit_suggestion_by_index(0, &s.composer);
    assert_eq!(consumed, Some(CONSUMED_ALL_CHARACTERS));
    assert_eq!(s.session.state(), SessionState::Composition);
    s.composer.reset();

    match s.session.pop_output(&s.composer) {
        Some(Output::Result(result)) => assert_eq!(result.value, "もずくす"),
        other => panic!("expected result, got {other:?}"),
    }
    assert_eq!(s.stats.count("CommitFromPrediction"), 1);
}

#[test]
fn test_partial_suggestion_commit_then_continue() {
    let mut s = Session::new();
    let mut segment = mock_segment("かまぼこの", &["かまぼこの"]);
    {
        let candidate = segment.candidate_mut(0).unwrap();
        candidate.attributes = libkana_core::CandidateAttributes::PARTIALLY_KEY_CONSUMED;
        candidate.consumed_key_size = Some(5);
    }
    s.converter.set_suggestion("かまぼこのいんぼう", vec![segment]);

    s.type_keys("kamabokonoinnbou");
    assert!(s.session.suggest(&s.composer));
    let consumed = s.session.commit_suggestion_by_index(0, &s.composer);
    assert_eq!(consumed, Some(5));

    // The uncommitted remainder is still a live conversion segment.
    assert_eq!(s.session.segments().conversion_segments_len(), 1);
    assert_eq!(
        s.session.segments().conversion_segment(0).map(|seg| seg.key()),
        Some("いんぼう")
    );
    assert_eq!(s.session.segments().history_len(), 1);

    // The session layer trims the committed characters off the composer.
    s.composer.delete_range_head(consumed.unwrap());
    assert_eq!(s.composer.query_for_conversion(), "いんぼう");
}

#[test]
fn test_segment_resize_reconverts() {
    let mut s = Session::new();
    s.converter.set_conversion(
        "かまぼこの",
        vec![
            mock_segment("かまぼこ", &["蒲鉾"]),
            mock_segment("の", &["の"]),
        ],
    );
    s.type_keys("kamabokono");
    s.session.convert(&s.composer);
    assert_eq!(s.session.segments().conversion_segments_len(), 2);

    s.session.segment_width_expand(&s.composer);
    assert_eq!(s.session.segments().conversion_segments_len(), 1);
    assert_eq!(
        s.session.segments().conversion_segment(0).map(|seg| seg.key()),
        Some("かまぼこの")
    );
}

#[test]
fn test_command_candidate_commit_has_no_text() {
    let mut s = Session::new();
    let mut segment = mock_segment("ないしょ", &[""]);
    {
        let candidate = segment.candidate_mut(0).unwrap();
        candidate.attributes = libkana_core::CandidateAttributes::COMMAND_CANDIDATE;
        candidate.command = Some(libkana_core::CandidateCommand::EnablePresentationMode);
    }
    s.converter.set_conversion("ないしょ", vec![segment]);

    s.composer.insert_character_key_and_preedit("naisho", "ないしょ");
    s.session.convert(&s.composer);
    s.session.commit(&s.composer);
    s.composer.reset();

    assert!(s.settings.presentation_mode());
    assert!(s.session.pop_output(&s.composer).is_none());
    assert_eq!(s.converter.finish_count(), 0);
}

#[test]
fn test_candidate_ids_survive_suggestion_expansion() {
    let mut s = Session::new();
    s.converter
        .set_suggestion("も", vec![mock_segment("も", &["もずくす"])]);
    s.converter.set_prediction(
        "も",
        vec![mock_segment("も", &["もずくす", "森", "もしもし"])],
    );
    s.type_keys("mo");
    assert!(s.session.suggest(&s.composer));

    let first_id = match s.session.pop_output(&s.composer) {
        Some(Output::Candidates(window)) => window.candidates[0].id,
        other => panic!("expected window, got {other:?}"),
    };

    assert!(s.session.expand_suggestion(&s.composer));
    match s.session.pop_output(&s.composer) {
        Some(Output::Candidates(window)) => {
            assert_eq!(window.candidates[0].id, first_id);
            assert!(window.total > 1);
            // Committing by the original id still works after the expand.
            let consumed = s.session.commit_suggestion_by_id(first_id, &s.composer);
            assert_eq!(consumed, Some(CONSUMED_ALL_CHARACTERS));
        }
        other => panic!("expected window, got {other:?}"),
    }
    s.composer.reset();
    match s.session.pop_output(&s.composer) {
        Some(Output::Result(result)) => assert_eq!(result.value, "もずくす"),
        other => panic!("expected result, got {other:?}"),
    }
}

#[test]
fn test_clone_preserves_focus() {
    let mut s = Session::new();
    s.converter.set_conversion(
        "かな",
        vec![mock_segment("かな", &["仮名", "かな", "カナ"])],
    );
    s.type_keys("kana");
    s.session.convert(&s.composer);
    s.session.candidate_next(&s.composer);
    s.session.candidate_next(&s.composer);

    let mut cloned = s.session.clone();
    assert_eq!(cloned.state(), SessionState::Conversion);
    assert!(cloned.is_candidate_list_visible());
    match cloned.pop_output(&s.composer) {
        Some(Output::Candidates(window)) => assert_eq!(window.focused_index, Some(2)),
        other => panic!("expected window, got {other:?}"),
    }
}

#[test]
fn test_stale_context_rebuilds_history() {
    let mut s = Session::new();
    s.converter
        .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
    s.type_keys("kana");
    s.session.convert(&s.composer);
    s.session.commit(&s.composer);
    s.composer.reset();
    assert_eq!(s.session.segments().history_len(), 1);

    s.session.on_start_composition(&InputContext {
        revision: Some(7),
        preceding_text: Some("無関係な前文".to_string()),
    });
    let history_value = s
        .session
        .segments()
        .segment(0)
        .and_then(|seg| seg.candidate(0))
        .map(|c| c.value.clone());
    assert_eq!(history_value.as_deref(), Some("無関係な前文"));
}

#[test]
fn test_reset_drops_history_midway() {
    let mut s = Session::new();
    s.converter
        .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
    s.type_keys("kana");
    s.session.convert(&s.composer);
    s.session.reset();
    assert_eq!(s.session.state(), SessionState::Composition);
    assert!(s.session.segments().is_empty());
    assert_eq!(s.converter.reset_count(), 1);
}
