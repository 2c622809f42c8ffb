/// A typed span of tokens, with an inclusive end
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    /// The entity type (e.g., "PER")
    pub kind: String,

    /// Index of the first token
    pub start: usize,

    /// Index of the last token
    pub end: usize,
}

/// Chunk position prefixes, with BILOU's `L`/`U` folded into `E`/`S`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Prefix {
    Begin,
    Inside,
    End,
    Single,
    Outside,
}

fn parse(tag: &str) -> (Prefix, &str) {
    let Some((prefix, kind)) = tag.split_once('-') else {
        return (Prefix::Outside, "");
    };

    let prefix = match prefix {
        "B" => Prefix::Begin,
        "I" => Prefix::Inside,
        "E" | "L" => Prefix::End,
        "S" | "U" => Prefix::Single,
        _ => return (Prefix::Outside, ""),
    };

    (prefix, kind)
}

fn ends_chunk(prev: Prefix, prev_kind: &str, tag: Prefix, kind: &str) -> bool {
    use Prefix::*;

    match (prev, tag) {
        (Outside, _) => false,
        (End | Single, _) => true,
        (Begin | Inside, Begin | Single | Outside) => true,
        _ => prev_kind != kind,
    }
}

fn starts_chunk(prev: Prefix, prev_kind: &str, tag: Prefix, kind: &str) -> bool {
    use Prefix::*;

    match (prev, tag) {
        (_, Outside) => false,
        (_, Begin | Single) => true,
        (End | Single | Outside, End | Inside) => true,
        _ => prev_kind != kind,
    }
}

/// Extract entity chunks from one sentence's tags.
///
/// Lenient IOB decoding: an `I-` tag that follows `O` or a different type opens a new
/// entity. Tags without a recognised `X-` prefix count as outside.
pub fn extract<S: AsRef<str>>(tags: &[S]) -> Vec<Entity> {
    let mut entities = Vec::new();

    let mut prev = Prefix::Outside;
    let mut prev_kind = "";
    let mut begin = 0;

    let sentinel = std::iter::once("O");
    for (i, tag) in tags.iter().map(|t| t.as_ref()).chain(sentinel).enumerate() {
        let (prefix, kind) = parse(tag);

        if ends_chunk(prev, prev_kind, prefix, kind) {
            entities.push(Entity {
                kind: prev_kind.to_string(),
                start: begin,
                end: i - 1,
            });
        }

        if starts_chunk(prev, prev_kind, prefix, kind) {
            begin = i;
        }

        prev = prefix;
        prev_kind = kind;
    }

    entities
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn spans(tags: &[&str]) -> Vec<(String, usize, usize)> {
        extract(tags)
            .into_iter()
            .map(|e| (e.kind, e.start, e.end))
            .collect()
    }

    #[test]
    fn decodes_iob2() {
        assert_eq!(
            spans(&["B-PER", "I-PER", "O", "B-LOC", "B-LOC", "I-LOC"]),
            vec![
                ("PER".to_string(), 0, 1),
                ("LOC".to_string(), 3, 3),
                ("LOC".to_string(), 4, 5),
            ]
        );
    }

    #[test]
    fn inside_tag_opens_entity_leniently() {
        assert_eq!(
            spans(&["I-ORG", "I-ORG", "I-PER", "O", "I-LOC"]),
            vec![
                ("ORG".to_string(), 0, 1),
                ("PER".to_string(), 2, 2),
                ("LOC".to_string(), 4, 4),
            ]
        );
    }

    #[test]
    fn decodes_iobes() {
        assert_eq!(
            spans(&["S-PER", "B-ORG", "I-ORG", "E-ORG", "U-LOC"]),
            vec![
                ("PER".to_string(), 0, 0),
                ("ORG".to_string(), 1, 3),
                ("LOC".to_string(), 4, 4),
            ]
        );
    }

    #[test]
    fn unprefixed_tags_are_outside() {
        assert!(spans(&["O", "3", "PER", "X-PER"]).is_empty());
    }
}
