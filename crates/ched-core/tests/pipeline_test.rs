use approx::assert_relative_eq;
use ched_core::{ExportPipeline, PipelineError, SusExportPlugin, TimelineError};
use ched_domain_score::{BtNote, ScoreBook, TempoError};
use ched_ports::config::SusArgs;
use pretty_assertions::assert_eq;

fn pipeline() -> ExportPipeline {
    ExportPipeline::new(Box::new(SusExportPlugin::new(SusArgs::default())))
}

#[test]
fn reports_what_was_exported() {
    let mut book = ScoreBook::new(480);
    book.score.notes.bts.push(BtNote::hold(0, 1920, 0));
    book.score.notes.bts.push(BtNote::chip(960, 1));

    let mut out = Vec::new();
    let report = pipeline().run(&mut book, &mut out, false).unwrap();

    assert_eq!(report.notes, 2);
    assert_eq!(report.bars, 2);
    assert_relative_eq!(report.length_seconds, 2.0);
    assert_eq!(report.bytes_written, out.len() as u64);
    assert!(book.export_args.contains_key("sus"));
}

#[test]
fn broken_tempo_maps_stop_before_writing() {
    let mut book = ScoreBook::new(480);
    book.score.events.bpm_change_events.clear();

    let mut out = Vec::new();
    let err = pipeline().run(&mut book, &mut out, false).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Timeline(TimelineError::Tempo(TempoError::MissingInitialTempo))
    ));
    assert!(out.is_empty());
}

#[test]
fn plugin_failures_name_the_plugin() {
    let mut book = ScoreBook::new(480);
    book.score.notes.bts.push(BtNote::chip(0, 4));

    let err = pipeline().run(&mut book, &mut Vec::<u8>::new(), true).unwrap_err();
    match err {
        PipelineError::Plugin { plugin, .. } => assert_eq!(plugin, "Sliding Universal Score (*.sus)"),
        other => panic!("unexpected error: {other:?}"),
    }
}
