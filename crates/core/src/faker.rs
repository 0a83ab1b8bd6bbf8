//! Built-in synthetic data for `setVar` faker expressions.
//!
//! Patterns embed `{{category.method}}` placeholders, e.g.
//! `"{{name.lastName}} <{{internet.email}}>"`. Each placeholder is
//! replaced independently; text outside placeholders is kept verbatim.

use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

use crate::domain::FakeData;
use crate::error::{CoreError, Result};

struct LocaleTables {
    first_names: &'static [&'static str],
    last_names: &'static [&'static str],
    cities: &'static [&'static str],
    streets: &'static [&'static str],
    companies: &'static [&'static str],
    words: &'static [&'static str],
    phone_format: &'static str,
    family_name_first: bool,
}

const EN: LocaleTables = LocaleTables {
    first_names: &["James", "Mary", "Robert", "Linda", "Michael", "Susan", "David", "Karen"],
    last_names: &["Smith", "Johnson", "Brown", "Taylor", "Miller", "Wilson", "Moore", "Clark"],
    cities: &["Springfield", "Riverside", "Fairview", "Georgetown", "Madison", "Salem"],
    streets: &["Main Street", "Oak Avenue", "Maple Road", "Cedar Lane", "Park Drive"],
    companies: &["Acme", "Globex", "Initech", "Umbrella", "Hooli", "Vandelay"],
    words: &["alpha", "lorem", "ipsum", "dolor", "amet", "tempor", "magna", "velit"],
    phone_format: "###-###-####",
    family_name_first: false,
};

const ZH_CN: LocaleTables = LocaleTables {
    first_names: &["伟", "芳", "娜", "敏", "静", "强", "磊", "军"],
    last_names: &["王", "李", "张", "刘", "陈", "杨", "黄", "赵"],
    cities: &["北京", "上海", "广州", "深圳", "杭州", "成都"],
    streets: &["人民路", "解放路", "中山路", "建设路", "和平街"],
    companies: &["华信科技", "新华传媒", "东方电子", "长城软件"],
    words: &["数据", "测试", "用户", "系统", "页面", "模块"],
    phone_format: "1##########",
    family_name_first: true,
};

fn tables(locale: &str) -> &'static LocaleTables {
    match locale {
        "zh_CN" | "zh-CN" | "zh" => &ZH_CN,
        _ => &EN,
    }
}

// Compiled once; the pattern is a literal.
static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();

fn placeholder_pattern() -> Option<&'static Regex> {
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z]+)\.([A-Za-z]+)\s*\}\}").ok())
        .as_ref()
}

/// Random-table faker covering the common placeholder families.
#[derive(Debug, Clone, Default)]
pub struct PatternFaker;

impl PatternFaker {
    pub fn new() -> Self {
        Self
    }

    fn expand(&self, locale: &str, category: &str, method: &str) -> Option<String> {
        let t = tables(locale);
        let mut rng = rand::thread_rng();
        let pick = |list: &'static [&'static str], rng: &mut rand::rngs::ThreadRng| {
            list.choose(rng).copied().unwrap_or_default().to_string()
        };

        let value = match (category, method) {
            ("name", "firstName") => pick(t.first_names, &mut rng),
            ("name", "lastName") => pick(t.last_names, &mut rng),
            ("name", "findName") => {
                let first = pick(t.first_names, &mut rng);
                let last = pick(t.last_names, &mut rng);
                if t.family_name_first {
                    format!("{last}{first}")
                } else {
                    format!("{first} {last}")
                }
            }
            ("internet", "userName") => {
                let word = pick(EN.words, &mut rng);
                format!("{word}{}", rng.gen_range(10..10_000))
            }
            ("internet", "email") => {
                let word = pick(EN.words, &mut rng);
                format!("{word}{}@example.com", rng.gen_range(10..10_000))
            }
            ("phone", "phoneNumber") => t
                .phone_format
                .chars()
                .map(|c| {
                    if c == '#' {
                        char::from(b'0' + rng.gen_range(0..10u8))
                    } else {
                        c
                    }
                })
                .collect(),
            ("address", "city") => pick(t.cities, &mut rng),
            ("address", "streetAddress") => {
                format!("{} {}", rng.gen_range(1..1000), pick(t.streets, &mut rng))
            }
            ("company", "companyName") => pick(t.companies, &mut rng),
            ("lorem", "word") => pick(t.words, &mut rng),
            ("random", "number") => rng.gen_range(0..100_000).to_string(),
            _ => return None,
        };
        Some(value)
    }
}

impl FakeData for PatternFaker {
    fn fake(&self, locale: &str, pattern: &str) -> Result<String> {
        let Some(placeholder) = placeholder_pattern() else {
            return Ok(pattern.to_string());
        };
        let mut output = String::with_capacity(pattern.len());
        let mut last = 0;

        for caps in placeholder.captures_iter(pattern) {
            let (Some(whole), Some(category), Some(method)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            output.push_str(&pattern[last..whole.start()]);
            let value = self
                .expand(locale, category.as_str(), method.as_str())
                .ok_or_else(|| CoreError::UnknownPlaceholder(whole.as_str().to_string()))?;
            output.push_str(&value);
            last = whole.end();
        }

        output.push_str(&pattern[last..]);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let faker = PatternFaker::new();
        assert_eq!(faker.fake("en", "hello world").unwrap(), "hello world");
    }

    #[test]
    fn test_expands_placeholders() {
        let faker = PatternFaker::new();
        let value = faker.fake("en", "{{name.firstName}} <{{internet.email}}>").unwrap();

        assert!(!value.contains("{{"));
        assert!(value.contains("@example.com>"));
        let first = value.split(' ').next().unwrap();
        assert!(EN.first_names.contains(&first));
    }

    #[test]
    fn test_phone_number_format() {
        let faker = PatternFaker::new();
        let phone = faker.fake("zh_CN", "{{phone.phoneNumber}}").unwrap();

        assert_eq!(phone.len(), 11);
        assert!(phone.starts_with('1'));
        assert!(phone.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_unknown_locale_falls_back_to_en() {
        let faker = PatternFaker::new();
        let city = faker.fake("xx", "{{address.city}}").unwrap();
        assert!(EN.cities.contains(&city.as_str()));
    }

    #[test]
    fn test_unknown_placeholder() {
        let faker = PatternFaker::new();
        assert!(matches!(
            faker.fake("en", "{{name.nickname}}"),
            Err(CoreError::UnknownPlaceholder(p)) if p == "{{name.nickname}}"
        ));
    }
}
