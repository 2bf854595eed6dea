use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use tagstream_stream_parser::ExtractedText;
use tagstream_stream_parser::Segment;
use tagstream_stream_parser::StreamSegmenter;
use tagstream_stream_parser::TagContentExtractor;
use tagstream_stream_parser::TaggedBlock;

const BLOCKS: [&str; 3] = ["read_file", "write_to_file", "t"];
const FIELDS: [&str; 2] = ["path", "content"];

const INPUTS: &[&str] = &[
    "Do X: <read_file><path>a.txt</path></read_file> done",
    "<t>A<t>B</t>C</t>tail",
    "<write_to_file><path>f.rs</path><content>\nfn main() {}\n</content></write_to_file>",
    "hello <to <read_file>unclosed",
    "a <read_file><path>x</read_file> b",
    "<wri<write_to_file><path>p</path><content>partial",
    "<write_to_file><path>p</path></wri",
    "é <t>ü</t> ö <re",
    "<<read_file><path>&lt;</path></read_file><",
];

const LIMITED_INPUTS: &[&str] = &[
    "<t>123456789<t>ok</t>",
    "x<t>1<t>2</t>345678</t>y <t>z</t>",
    "<t>1234</t><t>123456<t>abc</t>",
    "<read_file><path>abc</path></read_file> <t>é</t>",
    "<t>ééééé<t>é</t>",
];

fn segmenter(escape: bool, max_block_bytes: Option<usize>) -> anyhow::Result<StreamSegmenter> {
    Ok(StreamSegmenter::with_names(BLOCKS, FIELDS)?
        .with_escape_truncated_markers(escape)
        .with_max_block_bytes(max_block_bytes))
}

/// Feed `chunks` in order and coalesce adjacent text across calls.
fn run(chunks: &[&str], escape: bool) -> anyhow::Result<Vec<Segment>> {
    run_limited(chunks, escape, None)
}

fn run_limited(
    chunks: &[&str],
    escape: bool,
    max_block_bytes: Option<usize>,
) -> anyhow::Result<Vec<Segment>> {
    let mut segmenter = segmenter(escape, max_block_bytes)?;
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(segmenter.feed(chunk)?);
    }
    events.extend(segmenter.finish()?);
    Ok(coalesce(events))
}

fn coalesce(events: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for event in events {
        match (out.last_mut(), event) {
            (Some(Segment::Text(existing)), Segment::Text(text)) => existing.push_str(&text),
            (_, event) => out.push(event),
        }
    }
    out
}

fn reassemble(events: &[Segment]) -> String {
    events
        .iter()
        .map(|event| match event {
            Segment::Text(text) => text.as_str(),
            Segment::Block(block) => block.raw_span.as_str(),
        })
        .collect()
}

fn char_boundaries(input: &str) -> Vec<usize> {
    input
        .char_indices()
        .map(|(idx, _)| idx)
        .skip(1)
        .chain(std::iter::once(input.len()))
        .collect()
}

#[test]
fn events_do_not_depend_on_two_way_splits() -> anyhow::Result<()> {
    for &input in INPUTS {
        let whole = run(&[input], true)?;
        for split in char_boundaries(input) {
            let (head, tail) = input.split_at(split);
            assert_eq!(run(&[head, tail], true)?, whole, "split {head:?} | {tail:?}");
        }
    }
    Ok(())
}

#[test]
fn events_do_not_depend_on_three_way_splits() -> anyhow::Result<()> {
    for &input in INPUTS {
        let whole = run(&[input], true)?;
        let boundaries = char_boundaries(input);
        for (idx, &first) in boundaries.iter().enumerate() {
            for &second in &boundaries[idx..] {
                let chunks = [&input[..first], &input[first..second], &input[second..]];
                assert_eq!(run(&chunks, true)?, whole, "chunks {chunks:?}");
            }
        }
    }
    Ok(())
}

#[test]
fn char_by_char_feeding_matches_one_shot() -> anyhow::Result<()> {
    for &input in INPUTS {
        let chars: Vec<String> = input.chars().map(String::from).collect();
        let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(run(&chunks, true)?, run(&[input], true)?, "input {input:?}");
    }
    Ok(())
}

#[test]
fn text_and_raw_spans_reassemble_the_input() -> anyhow::Result<()> {
    for &input in INPUTS {
        for split in char_boundaries(input) {
            let (head, tail) = input.split_at(split);
            let events = run(&[head, tail], false)?;
            assert_eq!(reassemble(&events), input);
        }
    }
    Ok(())
}

#[test]
fn escaping_only_touches_the_unparseable_tail() -> anyhow::Result<()> {
    let input = "keep <re <write_to_file>a<read_f";
    let expected = vec![Segment::Text(
        "keep <re <write_to_file>a&lt;read_f".to_string(),
    )];
    for split in char_boundaries(input) {
        let (head, tail) = input.split_at(split);
        assert_eq!(run(&[head, tail], true)?, expected);
    }
    Ok(())
}

#[test]
fn block_size_limit_does_not_depend_on_splits() -> anyhow::Result<()> {
    for &input in LIMITED_INPUTS {
        let whole = run_limited(&[input], true, Some(9))?;
        assert_eq!(reassemble(&whole), input);
        let boundaries = char_boundaries(input);
        for (idx, &first) in boundaries.iter().enumerate() {
            for &second in &boundaries[idx..] {
                let chunks = [&input[..first], &input[first..second], &input[second..]];
                assert_eq!(
                    run_limited(&chunks, true, Some(9))?,
                    whole,
                    "chunks {chunks:?}"
                );
            }
        }
    }

    assert_eq!(
        run_limited(&["<t>123456789<t>ok</t>"], true, Some(9))?,
        run_limited(&["<t>123456789", "<t>ok</t>"], true, Some(9))?
    );
    Ok(())
}

#[test]
fn aborted_block_text_never_ends_inside_an_open_marker() -> anyhow::Result<()> {
    let mut segmenter = segmenter(true, Some(9))?;
    let events = segmenter.feed("<t>123456<")?;
    assert_eq!(events, vec![Segment::Text("<t>123456".to_string())]);
    assert_eq!(
        segmenter.feed("t>ok</t>")?,
        vec![Segment::Block(TaggedBlock {
            name: "t".to_string(),
            fields: IndexMap::new(),
            complete: true,
            raw_span: "<t>ok</t>".to_string(),
        })]
    );
    Ok(())
}

#[test]
fn extractor_output_does_not_depend_on_splits() -> anyhow::Result<()> {
    let input = "pre <think>a <b> c</think> mid <think>tail</thi";
    let collect = |chunks: &[&str]| -> anyhow::Result<(String, String)> {
        let mut extractor = TagContentExtractor::new(["think"])?;
        let mut items = Vec::new();
        for chunk in chunks {
            items.extend(extractor.feed(chunk));
        }
        items.extend(extractor.finish());
        let mut outside = String::new();
        let mut inside = String::new();
        for item in items {
            match item {
                ExtractedText::Outside(text) => outside.push_str(&text),
                ExtractedText::Inside { text, .. } => inside.push_str(&text),
            }
        }
        Ok((outside, inside))
    };

    let whole = collect(&[input])?;
    assert_eq!(
        whole,
        ("pre  mid ".to_string(), "a <b> ctail</thi".to_string())
    );
    for split in char_boundaries(input) {
        let (head, tail) = input.split_at(split);
        assert_eq!(collect(&[head, tail])?, whole);
    }
    Ok(())
}
