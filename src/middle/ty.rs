//! The Brook type algebra. Every language operation has a corresponding total
//! method here: applying an operation to types it is not defined for returns
//! [`Type::Error`] describing the attempt instead of panicking, so the checker
//! can keep going and report every independent error in one pass.

use itertools::Itertools;

/// A Brook type. Types are value-equal by structure, never by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Void,
    /// `array[extent,base]`. The base may only be `Int` or `Bool`; the
    /// declaration checker enforces this.
    Array { base: Box<Type>, extent: u64 },
    /// `func(params):ret`. Parameter order is significant and fixed at
    /// declaration.
    Func { params: Vec<Type>, ret: Box<Type> },
    /// Terminal sentinel produced by a failed operation. Propagates through
    /// every operation that consumes it rather than being coerced away.
    Error(String),
}

impl Type {
    pub fn array(base: Type, extent: u64) -> Self {
        Type::Array {
            base: Box::new(base),
            extent,
        }
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Self {
        Type::Func {
            params,
            ret: Box::new(ret),
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error(_))
    }

    /// The return type, if this is a function type.
    pub fn func_ret(&self) -> Option<&Type> {
        match self {
            Type::Func { ret, .. } => Some(ret),
            _ => None,
        }
    }

    /// The element type, if this is an array type.
    pub fn array_base(&self) -> Option<&Type> {
        match self {
            Type::Array { base, .. } => Some(base),
            _ => None,
        }
    }

    /// Structural equivalence.
    ///
    /// Two arrays are equivalent iff their base types match; the extent is
    /// deliberately not compared (a documented quirk of the language,
    /// preserved here — see `array_equivalence_ignores_extent`). Two function
    /// types are equivalent iff their parameter lists and return types match
    /// element-wise.
    pub fn equivalent(&self, that: &Type) -> bool {
        match (self, that) {
            (Type::Int, Type::Int) | (Type::Bool, Type::Bool) | (Type::Void, Type::Void) => true,
            (Type::Array { base: a, .. }, Type::Array { base: b, .. }) => a.equivalent(b),
            (
                Type::Func { params: p1, ret: r1 },
                Type::Func { params: p2, ret: r2 },
            ) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(a, b)| a.equivalent(b))
                    && r1.equivalent(r2)
            }
            _ => false,
        }
    }

    pub fn add(&self, that: &Type) -> Type {
        match self {
            Type::Int if self.equivalent(that) => Type::Int,
            _ => Type::Error(format!("cannot add {self} with {that}")),
        }
    }

    pub fn sub(&self, that: &Type) -> Type {
        match self {
            Type::Int if self.equivalent(that) => Type::Int,
            _ => Type::Error(format!("cannot subtract {that} from {self}")),
        }
    }

    pub fn mul(&self, that: &Type) -> Type {
        match self {
            Type::Int if self.equivalent(that) => Type::Int,
            _ => Type::Error(format!("cannot multiply {self} with {that}")),
        }
    }

    pub fn div(&self, that: &Type) -> Type {
        match self {
            Type::Int if self.equivalent(that) => Type::Int,
            _ => Type::Error(format!("cannot divide {self} by {that}")),
        }
    }

    pub fn compare(&self, that: &Type) -> Type {
        match self {
            Type::Int if self.equivalent(that) => Type::Bool,
            _ => Type::Error(format!("cannot compare {self} with {that}")),
        }
    }

    pub fn and(&self, that: &Type) -> Type {
        match self {
            Type::Bool if self.equivalent(that) => Type::Bool,
            _ => Type::Error(format!("cannot compute {self} and {that}")),
        }
    }

    pub fn or(&self, that: &Type) -> Type {
        match self {
            Type::Bool if self.equivalent(that) => Type::Bool,
            _ => Type::Error(format!("cannot compute {self} or {that}")),
        }
    }

    pub fn not(&self) -> Type {
        match self {
            Type::Bool => Type::Bool,
            _ => Type::Error(format!("cannot negate {self}")),
        }
    }

    /// Assignment produces no value: a structurally matching source yields
    /// `Void`, anything else is a type mismatch.
    pub fn assign(&self, source: &Type) -> Type {
        match self {
            Type::Int | Type::Bool if self.equivalent(source) => Type::Void,
            _ => Type::Error(format!("cannot assign {source} to {self}")),
        }
    }

    /// Calling a function type with an element-wise equivalent argument list
    /// yields its return type.
    pub fn call(&self, args: &[Type]) -> Type {
        if let Type::Func { params, ret } = self
            && params.len() == args.len()
            && params.iter().zip(args).all(|(p, a)| p.equivalent(a))
        {
            return (**ret).clone();
        }

        Type::Error(format!(
            "cannot call {self} using ({})",
            args.iter().map(|a| a.to_string()).join(", ")
        ))
    }

    /// Indexing an array with an `Int` yields the base type.
    pub fn index(&self, that: &Type) -> Type {
        match self {
            Type::Array { base, .. } if matches!(that, Type::Int) => (**base).clone(),
            _ => Type::Error(format!("cannot index {self} with {that}")),
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::Array { base, extent } => write!(f, "array[{extent},{base}]"),
            Type::Func { params, ret } => write!(
                f,
                "func({}):{ret}",
                params.iter().map(|p| p.to_string()).join(", ")
            ),
            Type::Error(message) => write!(f, "{message}"),
        }
    }
}
