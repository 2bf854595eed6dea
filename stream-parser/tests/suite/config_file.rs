use std::fs;

use pretty_assertions::assert_eq;
use tagstream_stream_parser::Error;
use tagstream_stream_parser::Segment;
use tagstream_stream_parser::SegmenterConfig;

#[test]
fn segmenter_built_from_config_file_honors_its_options() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("segmenter.toml");
    fs::write(
        &path,
        r#"
block_names = ["write_to_file"]
field_names = ["path", "content"]
max_block_bytes = 32
escape_truncated_markers = false
"#,
    )?;

    let config = SegmenterConfig::load(&path)?;
    let mut segmenter = config.build_segmenter()?;

    let mut events = segmenter.feed("a <write_to_file><path>x</path>")?;
    events.extend(segmenter.feed("<content>far too long for the limit</content>")?);
    events.extend(segmenter.finish()?);
    assert_eq!(
        events,
        vec![
            Segment::Text("a ".to_string()),
            Segment::Text(
                "<write_to_file><path>x</path><content>far too long for the limit</content>"
                    .to_string()
            ),
        ]
    );
    Ok(())
}

#[test]
fn malformed_toml_reports_the_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "block_names = [\"a\"\n")?;

    match SegmenterConfig::load(&path) {
        Err(err @ Error::ConfigParse { .. }) => {
            assert!(err.to_string().contains("broken.toml"), "{err}");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
    Ok(())
}
