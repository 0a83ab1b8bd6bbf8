//! Turns dispatched actions into test source.
//!
//! Everything here is a pure function of its inputs, so the same action
//! sequence always renders to the same bytes.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use recorder_core::{
    Action, Comparator, ElementRef, EntryForm, ExpectTarget, Expectation, Pointer, TestCodeEntry,
    TestScript, VarSource, FAILED_MARK,
};

use crate::dispatch::Step;

/// Element wait written into generated code.
pub const GENERATED_WAIT_MS: u64 = 30_000;
/// Pause before each element step.
pub const STEP_DELAY_MS: u64 = 300;
/// Pause before a window switch and before waiting for the page body.
pub const SETTLE_DELAY_MS: u64 = 500;

pub const DEFAULT_UPLOAD_DIR: &str = r"c:\uploadFiles";

/// Placeholder replaced by the rendered test cases.
pub const TEST_CODES_PLACEHOLDER: &str = "{$testCodes}";

pub const DEFAULT_TEMPLATE: &str = r#"const path = require('path');
const chai = require('chai');
const faker = require('faker');
const JWebDriver = require('jwebdriver');

chai.use(JWebDriver.chaiSupportChainPromise);
const expect = chai.expect;

const rootPath = process.cwd();
const config = require(path.resolve(rootPath, 'config.json'));
const testVars = config.vars || {};

describe('recorded session', function () {
    this.timeout(60000);

    let browser;

    before(function* () {
        const driver = new JWebDriver({
            host: process.env.WEBDRIVER_HOST || '127.0.0.1',
            port: process.env.WEBDRIVER_PORT || 4444
        });
        browser = yield driver.session({ browserName: 'chrome' });
    });

{$testCodes}

    function callSpec(name) {
        const spec = name.replace(/\.actions\.json$/, '');
        require(path.resolve(rootPath, spec))(browser, testVars);
    }

    after(function* () {
        yield browser.close();
    });
});
"#;

/// Escape `value` for a single-quoted source string literal.
pub fn escape_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn quote(value: &str) -> String {
    format!("'{}'", escape_str(value))
}

/// Render a coordinate the way the target language prints numbers.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Split `/pattern/flags`; anything else is taken as a bare pattern.
pub fn split_regex_literal(literal: &str) -> (&str, &str) {
    if let Some(body) = literal.strip_prefix('/') {
        if let Some(end) = body.rfind('/') {
            let flags = &body[end + 1..];
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                return (&body[..end], flags);
            }
        }
    }
    (literal, "")
}

fn regex_literal(literal: &str) -> String {
    let (pattern, flags) = split_regex_literal(literal);
    let mut out = String::from("/");
    let mut escaped = false;
    for c in pattern.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '/' if !escaped => out.push_str("\\/"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
        escaped = c == '\\' && !escaped;
    }
    if pattern.is_empty() {
        out.push_str("(?:)");
    }
    out.push('/');
    out.push_str(flags);
    out
}

/// `cmd: text ( detail )`, or `cmd: detail` without a caption.
pub fn title(cmd: &str, text: Option<&str>, detail: &str) -> String {
    match text {
        Some(text) => format!("{cmd}: {text} ( {detail} )"),
        None if detail.is_empty() => cmd.to_string(),
        None => format!("{cmd}: {detail}"),
    }
}

/// Builds the generated lines for each sub-task of a queued action.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    upload_dir: String,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_DIR)
    }
}

impl CodeGenerator {
    pub fn new(upload_dir: impl Into<String>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    /// Absolute path of an uploaded file inside the upload directory.
    pub fn upload_path(&self, filename: &str) -> String {
        let dir = self.upload_dir.as_str();
        if dir.ends_with('/') || dir.ends_with('\\') {
            format!("{dir}{filename}")
        } else if dir.contains('/') && !dir.contains('\\') {
            format!("{dir}/{filename}")
        } else {
            format!("{dir}\\{filename}")
        }
    }

    /// Entry for one queued sub-task.
    pub fn entry(&self, step: &Step<'_>) -> TestCodeEntry {
        match step {
            Step::SwitchWindow(window) => self.switch_window(*window),
            Step::SwitchFrame(frame) => self.switch_frame(*frame),
            Step::Act(action) => self.action(action),
        }
    }

    pub fn switch_window(&self, window: i64) -> TestCodeEntry {
        TestCodeEntry::test_case(
            title("switchWindow", None, &window.to_string()),
            vec![format!(
                "yield browser.sleep({SETTLE_DELAY_MS}).switchWindow({window});"
            )],
        )
    }

    pub fn switch_frame(&self, frame: Option<&str>) -> TestCodeEntry {
        let mut lines = vec!["yield browser.switchFrame(null);".to_string()];
        if let Some(frame) = frame {
            lines.push(format!(
                "var element = yield browser.wait({}, {GENERATED_WAIT_MS});",
                quote(frame)
            ));
            lines.push("yield browser.switchFrame(element).wait('body');".to_string());
        }
        TestCodeEntry::test_case(
            title("switchFrame", None, frame.unwrap_or("null")),
            lines,
        )
    }

    pub fn action(&self, action: &Action) -> TestCodeEntry {
        let cmd = action.cmd();
        match action {
            Action::Url { url } => simple(
                cmd,
                url,
                format!("yield browser.url({});", quote(url)),
            ),
            Action::CloseWindow => simple(cmd, "", "yield browser.closeWindow();".to_string()),
            Action::Sleep { time } => simple(
                cmd,
                &time.to_string(),
                format!("yield browser.sleep({time});"),
            ),
            Action::WaitBody => simple(
                cmd,
                "",
                format!(
                    "yield browser.sleep({SETTLE_DELAY_MS}).wait('body', {GENERATED_WAIT_MS});"
                ),
            ),
            Action::MouseMove(p) => self.pointer_entry(cmd, p, None),
            Action::MouseDown(p) => {
                self.pointer_entry(cmd, p, Some(format!(".mouseDown({})", p.button)))
            }
            Action::MouseUp(p) => self.pointer_entry(cmd, p, Some(format!(".mouseUp({})", p.button))),
            Action::Click(p) => self.pointer_entry(cmd, p, Some(format!(".click({})", p.button))),
            Action::DblClick(p) => self.pointer_entry(cmd, p, Some(".click().click()".to_string())),
            Action::TouchClick(target) => element_entry(
                cmd,
                target,
                &target.path,
                vec![format!("yield element.sleep({STEP_DELAY_MS}).touchClick();")],
            ),
            Action::SendKeys { keys } => simple(
                cmd,
                keys,
                format!("yield browser.sendKeys({});", quote(keys)),
            ),
            Action::KeyDown { character } => simple(
                cmd,
                character,
                format!("yield browser.keyDown({});", quote(character)),
            ),
            Action::KeyUp { character } => simple(
                cmd,
                character,
                format!("yield browser.keyUp({});", quote(character)),
            ),
            Action::ScrollTo { x, y } => {
                let (x, y) = (format_number(*x), format_number(*y));
                simple(
                    cmd,
                    &format!("{x}, {y}"),
                    format!("yield browser.scrollTo({x}, {y});"),
                )
            }
            Action::Select { target, option } => element_entry(
                cmd,
                target,
                &format!("{}, {}, {}", target.path, option.by.as_str(), option.value),
                vec![
                    format!("yield element.sleep({STEP_DELAY_MS}).select({{"),
                    format!("    type: {},", quote(option.by.as_str())),
                    format!("    value: {}", quote(&option.value)),
                    "});".to_string(),
                ],
            ),
            Action::AcceptAlert => simple(cmd, "", "yield browser.acceptAlert();".to_string()),
            Action::DismissAlert => simple(cmd, "", "yield browser.dismissAlert();".to_string()),
            Action::SetAlert { text } => simple(
                cmd,
                text,
                format!("yield browser.setAlert({});", quote(text)),
            ),
            Action::UploadFile { target, filename } => TestCodeEntry::test_case(
                title(cmd, target.label(), &format!("{}, {}", target.path, filename)),
                vec![
                    format!(
                        "var element = yield browser.sleep({STEP_DELAY_MS}).wait({}, {{timeout: {GENERATED_WAIT_MS}, displayed: false}});",
                        quote(&target.path)
                    ),
                    format!(
                        "yield element.sleep({STEP_DELAY_MS}).sendKeys({});",
                        quote(&self.upload_path(filename))
                    ),
                ],
            ),
            Action::Expect(expectation) => expect_entry(expectation),
            Action::SetVar { target, source } => set_var_entry(target, source),
            Action::Module { name } => TestCodeEntry::inline(
                title(cmd, None, name),
                vec![format!("callSpec({});", quote(name))],
            ),
        }
    }

    fn pointer_entry(&self, cmd: &str, pointer: &Pointer, effect: Option<String>) -> TestCodeEntry {
        let mut detail = pointer.path.clone();
        let movement = match pointer.offset() {
            Some((x, y)) => {
                let (x, y) = (format_number(x), format_number(y));
                let _ = write!(detail, ", {x}, {y}");
                format!("mouseMove(element, {x}, {y})")
            }
            None => "mouseMove(element)".to_string(),
        };
        if effect.is_some() {
            let _ = write!(detail, ", {}", pointer.button);
        }

        TestCodeEntry::test_case(
            title(cmd, pointer.label(), &detail),
            vec![
                wait_line(&pointer.path),
                format!(
                    "yield browser.sleep({STEP_DELAY_MS}).{movement}{};",
                    effect.unwrap_or_default()
                ),
            ],
        )
    }
}

fn simple(cmd: &str, detail: &str, line: String) -> TestCodeEntry {
    TestCodeEntry::test_case(title(cmd, None, detail), vec![line])
}

fn wait_line(path: &str) -> String {
    format!(
        "var element = yield browser.sleep({STEP_DELAY_MS}).wait({}, {GENERATED_WAIT_MS});",
        quote(path)
    )
}

fn element_entry(cmd: &str, target: &ElementRef, detail: &str, body: Vec<String>) -> TestCodeEntry {
    let mut lines = vec![wait_line(&target.path)];
    lines.extend(body);
    TestCodeEntry::test_case(title(cmd, target.label(), detail), lines)
}

fn expect_entry(expectation: &Expectation) -> TestCodeEntry {
    let target = &expectation.target;
    let mut lines = Vec::new();
    if let Some(path) = target.element_path() {
        lines.push(wait_line(path));
    }

    let fetch = match target {
        ExpectTarget::Value { .. } => "element.val()".to_string(),
        ExpectTarget::Text { .. } => "element.text()".to_string(),
        ExpectTarget::Displayed { .. } => "element.displayed()".to_string(),
        ExpectTarget::Enabled { .. } => "element.enabled()".to_string(),
        ExpectTarget::Selected { .. } => "element.selected()".to_string(),
        ExpectTarget::Attribute { name, .. } => format!("element.attr({})", quote(name)),
        ExpectTarget::Css { name, .. } => format!("element.css({})", quote(name)),
        ExpectTarget::Url => "browser.url()".to_string(),
        ExpectTarget::Title => "browser.title()".to_string(),
        ExpectTarget::Cookie { name } => format!("browser.cookie({})", quote(name)),
        ExpectTarget::LocalStorage { key } => format!("browser.localStorage({})", quote(key)),
        ExpectTarget::SessionStorage { key } => format!("browser.sessionStorage({})", quote(key)),
    };
    lines.push(format!("var value = yield {fetch};"));

    let expected = expectation.expected.as_str();
    lines.push(match expectation.comparator {
        Comparator::Equal if expected == "true" || expected == "false" => {
            format!("expect(value).to.equal({expected});")
        }
        Comparator::Equal => format!("expect(value).to.equal({});", quote(expected)),
        Comparator::Contain => format!("expect(value).to.contain({});", quote(expected)),
        Comparator::Regexp => format!("expect(value).to.match({});", regex_literal(expected)),
    });

    let params = serde_json::to_string(&target.params()).unwrap_or_default();
    let detail = format!(
        "{}, {}, {}, {}",
        target.kind(),
        params,
        expectation.comparator.as_str(),
        expected
    );
    TestCodeEntry::test_case(title("expect", None, &detail), lines)
}

fn set_var_entry(target: &ElementRef, source: &VarSource) -> TestCodeEntry {
    let mut lines = vec![wait_line(&target.path)];
    let (cmd, detail) = match source {
        VarSource::Faker { locale, pattern } => {
            lines.push(format!("faker.locale = {};", quote(locale)));
            lines.push(format!("yield element.val(faker.fake({}));", quote(pattern)));
            ("setFaker", format!("{}, {locale}, {pattern}", target.path))
        }
        VarSource::Variable { name } => {
            lines.push(format!("yield element.val(testVars[{}]);", quote(name)));
            ("setVar", format!("{}, {name}", target.path))
        }
    };
    TestCodeEntry::test_case(title(cmd, target.label(), &detail), lines)
}

/// Lay the script out as source lines, without indentation.
pub fn render_entries(script: &TestScript) -> Vec<String> {
    let mut out = Vec::new();
    for entry in script.entries() {
        match entry.form {
            EntryForm::TestCase => {
                out.push(format!("it({}, function*(){{", quote(&entry.title)));
                out.extend(entry.lines.iter().map(|line| format!("    {line}")));
                out.push("});".to_string());
            }
            EntryForm::Inline => {
                if entry.title.starts_with(FAILED_MARK) {
                    out.push(format!("// {}", entry.title.replace(['\r', '\n'], " ")));
                }
                out.extend(entry.lines.iter().cloned());
            }
        }
        out.push(String::new());
    }
    out
}

static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();

fn placeholder_pattern() -> Option<&'static Regex> {
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\$(\w+)\}").ok())
        .as_ref()
}

/// Substitute the rendered script into `template`.
///
/// Each script line is indented four spaces and lines are joined with CRLF.
/// Unknown `{$name}` tokens are left as they are.
pub fn render_template(template: &str, script: &TestScript) -> String {
    let codes = render_entries(script)
        .into_iter()
        .map(|line| {
            if line.is_empty() {
                line
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n");

    match placeholder_pattern() {
        Some(pattern) => pattern
            .replace_all(template, |caps: &Captures| match &caps[1] {
                "testCodes" => codes.clone(),
                _ => caps[0].to_string(),
            })
            .into_owned(),
        None => template.replace(TEST_CODES_PLACEHOLDER, &codes),
    }
}
