use crate::library::LIBRARY_PATH;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Namespace all generated evaluators live in
pub const NAMESPACE: &str = "formula_evaluator";
/// Name of the single function of a code unit
pub const ENTRY_POINT: &str = "execute";
/// Name of the function parameter
pub const PARAMETER: &str = "x";

static NEXT_TYPE_ID: AtomicUsize = AtomicUsize::new(0);

/// Numeric type the result of a unit is cast to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    F64,
    /// Results are rounded to single precision, then widened again.
    F32,
}

impl Default for ReturnType {
    fn default() -> Self {
        Self::F64
    }
}

impl ReturnType {
    /// Apply the cast to a computed value
    #[must_use]
    pub fn cast(self, value: f64) -> f64 {
        match self {
            Self::F64 => value,
            Self::F32 => f64::from(value as f32),
        }
    }
}

impl Display for ReturnType {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match *self {
            Self::F64 => write!(fmt, "f64"),
            Self::F32 => write!(fmt, "f32"),
        }
    }
}

/// The one function of a code unit: `fn <name>(<parameter>: f64) -> f64`
/// returning `<body>` cast to `return_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: &'static str,
    pub parameter: &'static str,
    pub return_type: ReturnType,
    pub body: String,
}

/// A minimal, independently compilable unit wrapping one expression.
///
/// # Examples
///
/// ```
/// # use calcfn::{CodeUnit, ReturnType};
/// let unit = CodeUnit::build("math::sin(x) + 1", ReturnType::F64);
/// assert_eq!(unit.imports, vec!["math"]);
/// assert_eq!(unit.function.name, "execute");
/// assert_eq!(unit.function.parameter, "x");
/// assert!(unit.to_string().contains("return (math::sin(x) + 1) as f64;"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CodeUnit {
    pub namespace: &'static str,
    pub imports: Vec<&'static str>,
    /// Unique for the process, so that units never clash
    pub type_name: String,
    pub function: FunctionDecl,
}

impl CodeUnit {
    /// Wrap `expression` in a fresh unit. The expression is not checked.
    #[must_use]
    pub fn build(expression: &str, return_type: ReturnType) -> Self {
        let id = NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            namespace: NAMESPACE,
            imports: vec![LIBRARY_PATH],
            type_name: format!("Evaluator{}", id),
            function: FunctionDecl {
                name: ENTRY_POINT,
                parameter: PARAMETER,
                return_type,
                body: expression.to_owned(),
            },
        }
    }

    /// Symbol under which backends export the entry point
    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}.{}.{}", self.namespace, self.type_name, self.function.name)
    }

    /// The expression the function returns
    #[must_use]
    pub fn body(&self) -> &str {
        &self.function.body
    }
}

impl Display for CodeUnit {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        writeln!(fmt, "mod {} {{", self.namespace)?;
        for import in &self.imports {
            writeln!(fmt, "    use {};", import)?;
        }
        writeln!(fmt)?;
        writeln!(fmt, "    pub struct {};", self.type_name)?;
        writeln!(fmt)?;
        writeln!(fmt, "    impl {} {{", self.type_name)?;
        let function = &self.function;
        writeln!(
            fmt,
            "        pub fn {}({}: f64) -> f64 {{",
            function.name, function.parameter
        )?;
        writeln!(
            fmt,
            "            return ({}) as {};",
            function.body, function.return_type
        )?;
        writeln!(fmt, "        }}")?;
        writeln!(fmt, "    }}")?;
        write!(fmt, "}}")
    }
}
