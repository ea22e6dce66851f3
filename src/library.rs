//! The math library generated code links against.
//!
//! Every function is an `extern "C"` wrapper over `libm`, so that the JIT can
//! call it through a symbol and the interpreter can call the very same
//! pointer. Both backends therefore produce identical results.

/// Module path under which the library is imported by code units.
pub const LIBRARY_PATH: &str = "math";

/// Signature of a one-argument library function.
pub type UnaryFn = extern "C" fn(f64) -> f64;
/// Signature of a two-argument library function.
pub type BinaryFn = extern "C" fn(f64, f64) -> f64;

/// What a library export is.
#[derive(Debug, Clone, Copy)]
pub enum Member {
    /// A named constant.
    Constant(f64),
    /// A function of one argument.
    Unary(UnaryFn),
    /// A function of two arguments.
    Binary(BinaryFn),
}

/// Operations with a native instruction, which the JIT emits inline instead
/// of calling the library symbol. They are exact, so results do not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Trunc,
}

/// A public member of the math library.
#[derive(Debug)]
pub struct Export {
    /// Canonical, case sensitive name.
    pub name: &'static str,
    /// Linker symbol of the function wrapper, empty for constants.
    pub symbol: &'static str,
    pub member: Member,
    pub intrinsic: Option<Intrinsic>,
}

impl Export {
    /// Number of arguments, `None` for constants.
    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        match self.member {
            Member::Constant(_) => None,
            Member::Unary(_) => Some(1),
            Member::Binary(_) => Some(2),
        }
    }

    /// Address of the function wrapper, for registering with a linker.
    #[must_use]
    pub fn address(&self) -> Option<*const u8> {
        match self.member {
            Member::Constant(_) => None,
            Member::Unary(func) => Some(func as *const u8),
            Member::Binary(func) => Some(func as *const u8),
        }
    }
}

macro_rules! unary {
    ($($name:ident => $libm:path;)*) => {
        $(
            extern "C" fn $name(x: f64) -> f64 {
                $libm(x)
            }
        )*
    };
}

macro_rules! binary {
    ($($name:ident => $libm:path;)*) => {
        $(
            extern "C" fn $name(a: f64, b: f64) -> f64 {
                $libm(a, b)
            }
        )*
    };
}

unary! {
    math_abs => libm::fabs;
    math_acos => libm::acos;
    math_acosh => libm::acosh;
    math_asin => libm::asin;
    math_asinh => libm::asinh;
    math_atan => libm::atan;
    math_atanh => libm::atanh;
    math_cbrt => libm::cbrt;
    math_ceil => libm::ceil;
    math_cos => libm::cos;
    math_cosh => libm::cosh;
    math_exp => libm::exp;
    math_floor => libm::floor;
    math_log => libm::log;
    math_log10 => libm::log10;
    math_log2 => libm::log2;
    math_round => libm::round;
    math_sin => libm::sin;
    math_sinh => libm::sinh;
    math_sqrt => libm::sqrt;
    math_tan => libm::tan;
    math_tanh => libm::tanh;
    math_truncate => libm::trunc;
}

binary! {
    math_atan2 => libm::atan2;
    math_max => libm::fmax;
    math_min => libm::fmin;
    math_pow => libm::pow;
    math_rem => libm::fmod;
}

// -1, 0 or 1; NaN stays NaN and both zeros map to 0.
extern "C" fn math_sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else if x.is_nan() {
        x
    } else {
        0.0
    }
}

/// Symbol of the `%` operator helper. Not an export: formulas reach it
/// through the operator only.
pub const REM_SYMBOL: &str = "calcfn_math_rem";
/// Symbol of the `^` operator helper, shared with the `pow` export.
pub const POW_SYMBOL: &str = "calcfn_math_pow";

/// Truncated remainder used for `%`.
pub const REM: BinaryFn = math_rem;
/// Power function used for `^`.
pub const POW: BinaryFn = math_pow;

macro_rules! export {
    (@intrinsic) => { None };
    (@intrinsic $intrinsic:ident) => { Some(Intrinsic::$intrinsic) };
    ($name:literal, Constant($value:expr)) => {
        Export {
            name: $name,
            symbol: "",
            member: Member::Constant($value),
            intrinsic: None,
        }
    };
    ($name:literal, $kind:ident($func:ident) $(, $intrinsic:ident)?) => {
        Export {
            name: $name,
            symbol: concat!("calcfn_", stringify!($func)),
            member: Member::$kind($func),
            intrinsic: export!(@intrinsic $($intrinsic)?),
        }
    };
}

/// The public surface of the math library, in declaration order.
pub static EXPORTS: &[Export] = &[
    export!("abs", Unary(math_abs), Abs),
    export!("acos", Unary(math_acos)),
    export!("acosh", Unary(math_acosh)),
    export!("asin", Unary(math_asin)),
    export!("asinh", Unary(math_asinh)),
    export!("atan", Unary(math_atan)),
    export!("atan2", Binary(math_atan2)),
    export!("atanh", Unary(math_atanh)),
    export!("cbrt", Unary(math_cbrt)),
    export!("ceil", Unary(math_ceil), Ceil),
    export!("cos", Unary(math_cos)),
    export!("cosh", Unary(math_cosh)),
    export!("exp", Unary(math_exp)),
    export!("floor", Unary(math_floor), Floor),
    export!("log", Unary(math_log)),
    export!("log10", Unary(math_log10)),
    export!("log2", Unary(math_log2)),
    export!("max", Binary(math_max)),
    export!("min", Binary(math_min)),
    export!("pow", Binary(math_pow)),
    export!("round", Unary(math_round)),
    export!("sign", Unary(math_sign)),
    export!("sin", Unary(math_sin)),
    export!("sinh", Unary(math_sinh)),
    export!("sqrt", Unary(math_sqrt), Sqrt),
    export!("tan", Unary(math_tan)),
    export!("tanh", Unary(math_tanh)),
    export!("truncate", Unary(math_truncate), Trunc),
    export!("E", Constant(std::f64::consts::E)),
];

/// Name of the π constant, which every vocabulary recognizes.
pub const PI_NAME: &str = "PI";

/// The π export. Kept outside of [`EXPORTS`] like a hand-registered entry.
pub static PI: Export = Export {
    name: PI_NAME,
    symbol: "",
    member: Member::Constant(std::f64::consts::PI),
    intrinsic: None,
};

/// Find an export by its exact canonical name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Export> {
    if name == PI_NAME {
        return Some(&PI);
    }
    EXPORTS.iter().find(|export| export.name == name)
}

/// Every function export with its linker symbol and address, plus the
/// operator helpers.
pub fn symbols() -> impl Iterator<Item = (&'static str, *const u8)> {
    EXPORTS
        .iter()
        .filter_map(|export| export.address().map(|address| (export.symbol, address)))
        .chain(std::iter::once((REM_SYMBOL, REM as *const u8)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("sin" => Some(1) ; "unary function")]
    #[test_case("atan2" => Some(2) ; "binary function")]
    #[test_case("PI" => None ; "constant")]
    #[test_case("E" => None ; "euler constant")]
    fn arity(name: &str) -> Option<usize> {
        lookup(name).unwrap().arity()
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(lookup("sin").is_some());
        assert!(lookup("Sin").is_none());
        assert!(lookup("pi").is_none());
        assert!(lookup("banana").is_none());
    }

    #[test]
    fn symbols_are_unique() {
        let mut names: Vec<_> = symbols().map(|(name, _)| name).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(names.contains(&POW_SYMBOL));
        assert!(names.contains(&REM_SYMBOL));
    }

    #[test]
    fn sign() {
        assert_eq!(math_sign(-3.0), -1.0);
        assert_eq!(math_sign(0.0), 0.0);
        assert_eq!(math_sign(12.5), 1.0);
        assert!(math_sign(f64::NAN).is_nan());
    }
}
