//! Positional format-string templates.
//!
//! A template is wire syntax with `{n}` / `{n:fmt}` slots standing for the
//! n-th argument:
//!
//! ```text
//! pk = {0} AND begins_with(sk, {1}) AND createdAt > {2:%Y%m%d}
//! ```
//!
//! Literal text passes through untouched. Each slot binds its argument to a
//! fresh value placeholder; `{{` and `}}` escape braces. Raw attribute names
//! that collide with reserved words are aliased to name placeholders, and
//! caller-written `#name` / `:value` tokens must already exist in the scope.
//!
//! A slot takes the value policy of the top-level attribute written before
//! it, or of the attribute behind a caller-written `#name`. The policy is
//! dropped for `size(..)`, for the type argument of `attribute_type(..)` and
//! for nested paths such as `parent.child` or `list[0]`.

use std::iter::Peekable;
use std::str::CharIndices;

use dynexpr_model::PropertyDescriptor;

use super::ast::FunctionName;
use super::binder::Binder;
use super::reserved::is_reserved;
use crate::error::{CompileError, CompileResult};
use crate::metadata::EntitySchema;
use crate::value::Value;

/// Words that pass through as grammar rather than attribute names.
const KEYWORDS: [&str; 9] = [
    "and", "or", "not", "between", "in", "set", "remove", "add", "delete",
];

/// The attribute a slot's value is compared against.
#[derive(Debug)]
struct SlotSubject {
    attribute: String,
    /// The slot does not hold a value of `attribute` itself.
    plain: bool,
}

/// Single-pass template rewriter.
pub(crate) struct TemplateParser<'t, 'a> {
    template: &'t str,
    chars: Peekable<CharIndices<'t>>,
    binder: &'t mut Binder<'a>,
    schema: Option<&'t EntitySchema>,
    args: &'t [Value],
    alias_reserved: bool,
    out: String,
    subject: Option<SlotSubject>,
    /// Nothing significant has followed the subject yet.
    subject_open: bool,
    after_dot: bool,
    /// Function whose first argument comes next.
    pending_function: Option<FunctionName>,
}

impl<'t, 'a> TemplateParser<'t, 'a> {
    pub(crate) fn new(
        template: &'t str,
        args: &'t [Value],
        schema: Option<&'t EntitySchema>,
        binder: &'t mut Binder<'a>,
        alias_reserved: bool,
    ) -> Self {
        Self {
            template,
            chars: template.char_indices().peekable(),
            binder,
            schema,
            args,
            alias_reserved,
            out: String::with_capacity(template.len()),
            subject: None,
            subject_open: false,
            after_dot: false,
            pending_function: None,
        }
    }

    /// Rewrite the whole template, returning the wire expression.
    pub(crate) fn parse(mut self) -> CompileResult<String> {
        while let Some(&(pos, ch)) = self.chars.peek() {
            match ch {
                '{' => self.read_slot(pos)?,
                '}' => {
                    self.chars.next();
                    if !self.eat('}') {
                        return Err(self.malformed(pos, "unbalanced '}'"));
                    }
                    self.out.push('}');
                }
                '#' | ':' => self.read_placeholder(pos, ch)?,
                c if is_ident_start(c) => self.read_word(pos)?,
                c => {
                    self.chars.next();
                    self.out.push(c);
                    if !c.is_whitespace() {
                        self.punctuation(c);
                    }
                }
            }
        }
        Ok(self.out)
    }

    fn punctuation(&mut self, c: char) {
        if self.subject_open && matches!(c, '.' | '[') {
            if let Some(subject) = self.subject.as_mut() {
                subject.plain = true;
            }
        }
        self.subject_open = false;
        self.after_dot = c == '.';
    }

    fn open_subject(&mut self, attribute: String) {
        let plain = matches!(
            self.pending_function.take(),
            Some(FunctionName::Size | FunctionName::AttributeType)
        );
        self.subject = Some(SlotSubject { attribute, plain });
        self.subject_open = true;
    }

    fn malformed(&self, position: usize, reason: impl Into<String>) -> CompileError {
        CompileError::MalformedTemplate {
            template: self.template.to_owned(),
            position,
            reason: reason.into(),
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn next_significant_is(&self, expected: char) -> bool {
        self.chars
            .clone()
            .map(|(_, c)| c)
            .find(|c| !c.is_whitespace())
            == Some(expected)
    }

    fn read_slot(&mut self, pos: usize) -> CompileResult<()> {
        self.chars.next(); // consume '{'
        if self.eat('{') {
            self.out.push('{');
            return Ok(());
        }

        let mut digits = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.chars.next();
        }

        let format = if self.eat(':') {
            let mut format = String::new();
            loop {
                match self.chars.next() {
                    Some((_, '}')) => break,
                    Some((_, c)) => format.push(c),
                    None => return Err(self.malformed(pos, "unbalanced '{'")),
                }
            }
            if format.is_empty() {
                return Err(self.malformed(pos, "empty slot format"));
            }
            Some(format)
        } else {
            match self.chars.next() {
                Some((_, '}')) => None,
                Some(_) => return Err(self.malformed(pos, "slot index must be numeric")),
                None => return Err(self.malformed(pos, "unbalanced '{'")),
            }
        };

        if digits.is_empty() {
            return Err(self.malformed(pos, "slot index must be numeric"));
        }
        let index: usize = digits
            .parse()
            .map_err(|_| self.malformed(pos, format!("slot index {digits} is too large")))?;
        let args = self.args;
        let Some(value) = args.get(index) else {
            return Err(self.malformed(
                pos,
                format!(
                    "slot {{{index}}} has no argument ({} supplied)",
                    args.len()
                ),
            ));
        };

        let descriptor = self.slot_descriptor(index, format.as_deref());
        let placeholder = self.binder.value(value, &descriptor)?;
        self.out.push_str(&placeholder);
        self.subject_open = false;
        self.after_dot = false;
        Ok(())
    }

    /// Value policy for a slot: the subject's metadata when the schema knows
    /// it, with the slot format taking precedence.
    fn slot_descriptor(&self, index: usize, format: Option<&str>) -> PropertyDescriptor {
        let known = match (&self.subject, self.schema) {
            (Some(subject), Some(schema)) if !subject.plain => {
                schema.resolve_attribute(&subject.attribute)
            }
            _ => None,
        };
        match (known, format) {
            (Some(descriptor), Some(format)) => descriptor.overriding_format(format),
            (Some(descriptor), None) => descriptor.clone(),
            (None, format) => {
                let field = self
                    .subject
                    .as_ref()
                    .map_or_else(|| format!("{{{index}}}"), |s| s.attribute.clone());
                let mut descriptor = PropertyDescriptor::new(field);
                descriptor.format = format.map(ToOwned::to_owned);
                descriptor
            }
        }
    }

    fn read_placeholder(&mut self, pos: usize, sigil: char) -> CompileResult<()> {
        self.chars.next(); // consume sigil
        let name = self.read_ident_chars();
        if name.is_empty() {
            return Err(self.malformed(pos, format!("expected a name after '{sigil}'")));
        }
        let token = format!("{sigil}{name}");
        let resolved = self.binder.reuse(&token)?;
        self.out.push_str(&resolved);
        if sigil == '#' && !self.after_dot {
            match self.binder.attribute_behind(&token).map(ToOwned::to_owned) {
                Some(attribute) => self.open_subject(attribute),
                None => self.subject = None,
            }
        } else {
            self.subject_open = false;
        }
        self.after_dot = false;
        Ok(())
    }

    fn read_ident_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            s.push(c);
            self.chars.next();
        }
        s
    }

    fn read_word(&mut self, pos: usize) -> CompileResult<()> {
        let word = self.read_ident_chars();
        let lower = word.to_ascii_lowercase();

        if !self.after_dot && KEYWORDS.contains(&lower.as_str()) {
            self.out.push_str(&word);
            self.subject_open = false;
            return Ok(());
        }

        if self.next_significant_is('(') {
            let Some(function) = FunctionName::parse(&word) else {
                return Err(self.malformed(pos, format!("unknown function '{word}'")));
            };
            self.pending_function = Some(function);
            self.out.push_str(&word);
            self.subject_open = false;
            self.after_dot = false;
            return Ok(());
        }

        if !self.after_dot {
            self.open_subject(word.clone());
        }
        if self.alias_reserved && is_reserved(&word) {
            let placeholder = self.binder.name(&word);
            self.out.push_str(&placeholder);
        } else {
            self.out.push_str(&word);
        }
        self.after_dot = false;
        Ok(())
    }
}

/// Returns `true` if `c` can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Returns `true` if `c` can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
