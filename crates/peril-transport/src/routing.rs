//! Routing-key matching for direct and topic exchanges.

/// Direct exchanges route on exact key equality.
pub fn direct_matches(binding_key: &str, routing_key: &str) -> bool {
    binding_key == routing_key
}

/// Topic exchanges treat keys as dot-separated words.
///
/// In the binding pattern, `*` stands for exactly one word and `#` for zero
/// or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return key.is_empty();
    };
    match *head {
        "#" => {
            match_words(rest, key)
                || (!key.is_empty() && match_words(pattern, &key[1..]))
        }
        "*" => !key.is_empty() && match_words(rest, &key[1..]),
        word => key.first() == Some(&word) && match_words(rest, &key[1..]),
    }
}
