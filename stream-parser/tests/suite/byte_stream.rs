use pretty_assertions::assert_eq;
use tagstream_stream_parser::Segment;
use tagstream_stream_parser::StreamSegmenter;
use tagstream_stream_parser::Utf8StreamParser;

fn run_bytes(chunks: &[&[u8]]) -> anyhow::Result<Vec<Segment>> {
    let mut parser = Utf8StreamParser::new(StreamSegmenter::with_names(["note"], ["title"])?);
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(parser.push_bytes(chunk)?);
    }
    events.extend(parser.finish()?);
    Ok(events
        .into_iter()
        .fold(Vec::new(), |mut acc: Vec<Segment>, event| {
            match (acc.last_mut(), event) {
                (Some(Segment::Text(existing)), Segment::Text(text)) => existing.push_str(&text),
                (_, event) => acc.push(event),
            }
            acc
        }))
}

#[test]
fn every_byte_split_yields_the_same_events() -> anyhow::Result<()> {
    let input = "héllo <note><title>日本語</title></note> ✓".as_bytes();
    let whole = run_bytes(&[input])?;
    assert_eq!(whole.len(), 3);

    for split in 1..input.len() {
        let (head, tail) = input.split_at(split);
        assert_eq!(run_bytes(&[head, tail])?, whole, "split at byte {split}");
    }
    Ok(())
}
