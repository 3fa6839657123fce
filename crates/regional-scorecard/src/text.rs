/// Uppercases with Turkish casing rules so that `i` maps to `İ` and `ı` to `I`.
pub(crate) fn turkish_uppercase(value: &str) -> String {
    value
        .chars()
        .flat_map(|ch| match ch {
            'i' => vec!['İ'],
            'ı' => vec!['I'],
            other => other.to_uppercase().collect(),
        })
        .collect()
}

/// Replaces Turkish specific letters with their closest ASCII counterpart.
pub(crate) fn ascii_fold(value: &str) -> String {
    value
        .chars()
        .map(|ch| match ch {
            'İ' => 'I',
            'ı' => 'i',
            'Ş' => 'S',
            'ş' => 's',
            'Ğ' => 'G',
            'ğ' => 'g',
            'Ü' => 'U',
            'ü' => 'u',
            'Ö' => 'O',
            'ö' => 'o',
            'Ç' => 'C',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Drops byte-order marks and zero-width characters, then collapses whitespace.
pub(crate) fn clean(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
