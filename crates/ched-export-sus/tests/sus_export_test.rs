use ched_domain_score::{
    BpmChange, BtNote, FxNote, HighSpeedChange, LaserNote, ScoreBook, TimeSignatureChange,
    TimeSignatureError,
};
use ched_export_sus::{IdentifierError, SusExportError, SusExporter};
use ched_ports::config::{Difficulty, SusArgs};
use pretty_assertions::assert_eq;

fn export(book: &ScoreBook, args: SusArgs) -> Result<String, SusExportError> {
    let mut out = Vec::new();
    SusExporter::new(book, args)?.export(&mut out)?;
    Ok(String::from_utf8(out).expect("sus output is utf-8"))
}

fn book_at_150() -> ScoreBook {
    let mut book = ScoreBook::new(480);
    book.title = "Test".to_string();
    book.score.events.bpm_change_events = vec![BpmChange::new(0, 150.0)];
    book
}

fn data_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| line.starts_with("#MEASUREBS") || line.chars().nth(1).is_some_and(|c| c.is_ascii_digit()))
        .collect()
}

#[test]
fn exports_a_single_hold_document() {
    let mut book = book_at_150();
    book.score.notes.bts.push(BtNote::hold(0, 1920, 0));

    let text = export(&book, SusArgs::default()).unwrap();

    let expected = [
        format!("This file was generated by Ched {}.", env!("CARGO_PKG_VERSION")),
        "#TITLE \"Test\"".to_string(),
        "#ARTIST \"\"".to_string(),
        "#DESIGNER \"\"".to_string(),
        "#DIFFICULTY 0".to_string(),
        "#PLAYLEVEL ".to_string(),
        "#SONGID \"\"".to_string(),
        "#WAVE \"\"".to_string(),
        "#WAVEOFFSET 0".to_string(),
        "#JACKET \"\"".to_string(),
        String::new(),
        "#REQUEST \"ticks_per_beat 480\"".to_string(),
        String::new(),
        "#00002: 4".to_string(),
        String::new(),
        "#BPM01: 150".to_string(),
        "#00008: 01".to_string(),
        String::new(),
        "#TIL00: \"\"".to_string(),
        "#HISPEED 00".to_string(),
        "#MEASUREHS 00".to_string(),
        String::new(),
        String::new(),
        String::new(),
        "#00023A: 11".to_string(),
        "#00123A: 21".to_string(),
        String::new(),
    ]
    .map(|line| line + "\n")
    .concat();

    assert_eq!(text, expected);
}

#[test]
fn header_carries_export_arguments() {
    let args = SusArgs {
        play_level: "14+".to_string(),
        play_difficulty: Difficulty::WorldsEnd,
        extended_difficulty: "覚".to_string(),
        song_id: "s001".to_string(),
        sound_file_name: "song.ogg".to_string(),
        sound_offset: 0.25,
        jacket_file_path: "jacket.png".to_string(),
        has_padding_bar: false,
        additional_data: "#BASEBPM 150".to_string(),
    };
    let text = export(&book_at_150(), args).unwrap();

    assert!(text.contains("#DIFFICULTY 4:覚\n"));
    assert!(text.contains("#PLAYLEVEL 14+\n"));
    assert!(text.contains("#SONGID \"s001\"\n"));
    assert!(text.contains("#WAVE \"song.ogg\"\n"));
    assert!(text.contains("#WAVEOFFSET 0.25\n"));
    assert!(text.contains("#JACKET \"jacket.png\"\n"));
    assert!(text.contains("#JACKET \"jacket.png\"\n\n#BASEBPM 150\n\n#REQUEST"));
}

#[test]
fn signature_and_tempo_changes_get_their_own_lines() {
    let mut book = book_at_150();
    book.score.events.time_signature_change_events = vec![
        TimeSignatureChange::common_time(),
        TimeSignatureChange::new(1920, 3, 2),
    ];
    book.score.events.bpm_change_events = vec![
        BpmChange::new(3360, 150.0),
        BpmChange::new(0, 150.0),
        BpmChange::new(1920, 200.0),
    ];

    let text = export(&book, SusArgs::default()).unwrap();

    assert!(text.contains("#00002: 4\n#00102: 3\n"));
    assert!(text.contains("#BPM01: 150\n#BPM02: 200\n"));
    assert!(text.contains("#00008: 01\n#00108: 02\n#00208: 01\n"));
    assert!(!text.contains("#BPM03"));
}

#[test]
fn high_speed_changes_form_the_til_line() {
    let mut book = book_at_150();
    book.score.events.high_speed_change_events = vec![
        HighSpeedChange {
            tick: 0,
            speed_ratio: 1.0,
        },
        HighSpeedChange {
            tick: 2400,
            speed_ratio: 2.5,
        },
    ];

    let text = export(&book, SusArgs::default()).unwrap();
    assert!(text.contains("#TIL00: \"0'0:1, 1'480:2.5\"\n"));
}

#[test]
fn short_notes_slams_and_lasers_use_their_channels() {
    let mut book = book_at_150();
    book.score.notes.bts.push(BtNote::chip(480, 3));
    book.score.notes.fxs.push(FxNote::chip(0, 1));
    book.score.notes.lasers.push(LaserNote::new(960, 0, 0, 0.0, 1.0));
    book.score.notes.lasers.push(LaserNote::new(0, 1920, 1, 1.0, 0.0));

    let text = export(&book, SusArgs::default()).unwrap();

    assert_eq!(
        data_lines(&text),
        vec![
            "#00002: 4",
            "#00008: 01",
            "#00017: 22",
            "#00016: 00110000",
            "#00051: 004Z",
            "#00038A: 1Z",
            "#00138A: 20",
        ]
    );
}

#[test]
fn stacked_chips_are_split_over_several_lines() {
    let mut book = book_at_150();
    book.score.notes.bts.push(BtNote::chip(0, 0));
    book.score.notes.bts.push(BtNote::chip(0, 0));
    book.score.notes.bts.push(BtNote::chip(960, 0));

    let text = export(&book, SusArgs::default()).unwrap();
    assert!(text.contains("#00013: 1111\n#00013: 11\n"));
}

#[test]
fn overlapping_holds_share_the_identifier_pool() {
    let mut book = book_at_150();
    book.score.notes.bts.push(BtNote::hold(0, 480, 0));
    book.score.notes.bts.push(BtNote::hold(240, 960, 1));
    book.score.notes.bts.push(BtNote::hold(960, 480, 2));

    let text = export(&book, SusArgs::default()).unwrap();
    assert!(text.contains(
        "#00023A: 11210000\n#00024B: 0011000000210000\n#00025A: 00001121\n"
    ));
}

#[test]
fn padding_bar_shifts_everything_but_the_initial_events() {
    let mut book = book_at_150();
    book.score.events.bpm_change_events.push(BpmChange::new(1920, 180.0));
    book.score.notes.bts.push(BtNote::chip(0, 0));

    let args = SusArgs {
        has_padding_bar: true,
        ..SusArgs::default()
    };
    let text = export(&book, args).unwrap();

    assert_eq!(
        data_lines(&text),
        vec!["#00002: 4", "#00008: 01", "#00208: 02", "#00113: 11"]
    );
}

#[test]
fn far_bars_are_written_in_measure_blocks() {
    let mut book = book_at_150();
    book.score.notes.bts.push(BtNote::chip(1920 * 1000, 0));
    book.score.notes.bts.push(BtNote::chip(1920 * 2001, 0));

    let text = export(&book, SusArgs::default()).unwrap();
    assert!(text.contains(
        "#MEASUREBS 1000\n#00013: 11\n#MEASUREBS 2000\n#00113: 11\n#MEASUREBS 0\n"
    ));
}

#[test]
fn invalid_signatures_fail_before_anything_is_written() {
    let mut book = book_at_150();
    book.score
        .events
        .time_signature_change_events
        .push(TimeSignatureChange::new(2020, 3, 2));

    let err = SusExporter::new(&book, SusArgs::default()).err().unwrap();
    match err {
        SusExportError::TimeSignature(TimeSignatureError::InvalidTimeSignature { tick, .. }) => {
            assert_eq!(tick, 2020)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn notes_outside_known_lanes_are_rejected() {
    let mut book = book_at_150();
    book.score.notes.bts.push(BtNote::chip(0, 7));

    let err = export(&book, SusArgs::default()).unwrap_err();
    assert!(matches!(err, SusExportError::InvalidNote(_)));
}

#[test]
fn too_many_overlapping_holds_exhaust_identifiers() {
    let mut book = book_at_150();
    for i in 0..37 {
        book.score.notes.bts.push(BtNote::hold(i, 10_000, (i % 4) as u8));
    }

    let err = export(&book, SusArgs::default()).unwrap_err();
    assert!(matches!(
        err,
        SusExportError::Identifier(IdentifierError::Exhausted { start_tick: 36 })
    ));
}

fn book_with_distinct_tempos(count: i64) -> ScoreBook {
    let mut book = book_at_150();
    book.score.events.bpm_change_events = (0..count)
        .map(|i| BpmChange::new(1920 * i, 100.0 + i as f64))
        .collect();
    book
}

#[test]
fn every_two_digit_key_can_name_a_tempo() {
    let text = export(&book_with_distinct_tempos(1295), SusArgs::default()).unwrap();

    assert!(text.contains("#BPM01: 100\n"));
    assert!(text.contains("#BPMZZ: 1394\n"));
    let definitions = text.lines().filter(|line| line.starts_with("#BPM")).count();
    assert_eq!(definitions, 1295);
}

#[test]
fn tempos_beyond_the_key_space_are_rejected() {
    let err = export(&book_with_distinct_tempos(1296), SusArgs::default()).unwrap_err();
    assert!(matches!(err, SusExportError::TooManyBpmDefinitions(1296)));
}
