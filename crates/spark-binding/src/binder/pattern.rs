//! 字段名模式匹配与规范化。

/// 简单通配符匹配：`*` 匹配任意长度（含空）的字符序列，可出现在模式任意位置、任意次数。
///
/// # 教案式说明
/// - **意图 (Why)**：允许/禁止字段列表需要支持 `"id"`、`"*Id"`、`"address.*"`、`"*secret*"`
///   这类写法，完整正则既昂贵又容易误配；
/// - **执行 (How)**：以首个 `*` 为界递归比较前缀与剩余模式；遇到 `*part*` 时枚举 `part`
///   在输入中的每个出现位置回溯；
/// - **契约 (What)**：空模式只匹配空串；不含 `*` 的模式退化为精确相等。
pub fn simple_match(pattern: &str, candidate: &str) -> bool {
    let Some(first) = pattern.find('*') else {
        return pattern == candidate;
    };

    if first == 0 {
        if pattern.len() == 1 {
            return true;
        }
        let Some(next) = pattern[1..].find('*').map(|offset| offset + 1) else {
            return candidate.ends_with(&pattern[1..]);
        };
        let part = &pattern[1..next];
        if part.is_empty() {
            return simple_match(&pattern[next..], candidate);
        }

        let mut from = 0;
        while let Some(offset) = candidate[from..].find(part) {
            let found = from + offset;
            if simple_match(&pattern[next..], &candidate[found + part.len()..]) {
                return true;
            }
            // 前进一个完整字符，保证切片落在 UTF-8 边界上。
            from = found
                + candidate[found..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
        return false;
    }

    candidate.get(..first) == Some(&pattern[..first])
        && simple_match(&pattern[first..], &candidate[first..])
}

/// 任一模式命中即返回 `true`。
pub fn simple_match_any<S: AsRef<str>>(patterns: &[S], candidate: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| simple_match(pattern.as_ref(), candidate))
}

/// 规范化字段路径：去除首尾空白，并剥掉 `[...]` 键中的单/双引号。
///
/// 例如 `map['key']` 与 `map["key"]` 都规范化为 `map[key]`。
pub fn canonical_field_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut canonical = String::with_capacity(trimmed.len());
    let mut rest = trimmed;

    while let Some(open) = rest.find('[') {
        canonical.push_str(&rest[..=open]);
        rest = &rest[open + 1..];
        let Some(close) = rest.find(']') else {
            break;
        };
        let key = &rest[..close];
        let unquoted = strip_matching_quotes(key);
        canonical.push_str(unquoted);
        canonical.push(']');
        rest = &rest[close + 1..];
    }
    canonical.push_str(rest);
    canonical
}

fn strip_matching_quotes(key: &str) -> &str {
    for quote in ['\'', '"'] {
        if key.len() >= 2 && key.starts_with(quote) && key.ends_with(quote) {
            return &key[1..key.len() - 1];
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wildcard_positions() {
        assert!(simple_match("id", "id"));
        assert!(!simple_match("id", "ids"));
        assert!(simple_match("*", "anything"));
        assert!(simple_match("*Id", "customerId"));
        assert!(simple_match("address.*", "address.city"));
        assert!(simple_match("*secret*", "mysecretkey"));
        assert!(simple_match("a*b*c", "aXXbYYc"));
        assert!(!simple_match("a*b*c", "aXXcYYb"));
        assert!(simple_match("**x", "yx"));
    }

    #[test]
    fn multibyte_candidates_do_not_panic() {
        assert!(simple_match("*名*", "姓名字段"));
        assert!(!simple_match("ab*", "名"));
    }

    #[test]
    fn canonical_names_strip_quoted_keys() {
        assert_eq!(canonical_field_name(" map['key'] "), "map[key]");
        assert_eq!(canonical_field_name("map[\"a\"].b[0]"), "map[a].b[0]");
        assert_eq!(canonical_field_name("plain"), "plain");
        assert_eq!(canonical_field_name("broken['x"), "broken['x");
    }

    proptest! {
        #[test]
        fn literal_patterns_match_only_themselves(a in "[a-z.]{0,12}", b in "[a-z.]{0,12}") {
            prop_assert_eq!(simple_match(&a, &b), a == b);
        }

        #[test]
        fn prefix_and_suffix_wildcards(prefix in "[a-z]{0,6}", suffix in "[a-z]{0,6}", middle in "[a-z]{0,6}") {
            let candidate = format!("{prefix}{middle}{suffix}");
            let prefix_pattern = format!("{prefix}*");
            let suffix_pattern = format!("*{suffix}");
            let both_pattern = format!("{prefix}*{suffix}");
            prop_assert!(simple_match(&prefix_pattern, &candidate));
            prop_assert!(simple_match(&suffix_pattern, &candidate));
            prop_assert!(simple_match(&both_pattern, &candidate));
        }
    }
}
