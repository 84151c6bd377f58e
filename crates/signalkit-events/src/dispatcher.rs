//! Variadic dispatch.
//!
//! A [`Handler`] is built once, at registration time, from either a typed
//! closure taking up to [`MAX_ARITY`] parameters or a variadic closure over
//! the raw argument slice. Building it fixes its [`Arity`] and erases the
//! typed closure behind an invoker that validates and converts each
//! argument. Every argument is converted before the closure runs, so a
//! rejected firing never partially invokes it.
//!
//! ## Handler identity
//!
//! Clones of one `Handler` share an instance and compare equal by
//! reference. Two independently built handlers compare equal structurally
//! when they wrap the same stateless callable: the same function item, or
//! non-capturing closures created by the same closure expression. Such
//! callables are zero-sized, so their type alone identifies the code that
//! runs. Function pointers, boxed closures and capturing closures carry data
//! their type does not describe and only ever match by reference.

use crate::error::DispatchError;
use crate::subscription::Subscription;
use crate::variant::{FromVariant, Variant};
use std::any::{type_name, TypeId};
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Largest parameter count a typed handler may declare
pub const MAX_ARITY: usize = 6;

/// Number of arguments an event carries or a handler takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly this many positional arguments
    Fixed(usize),
    /// Any number of arguments, passed through unchanged
    Variadic,
}

impl Arity {
    /// True when a firing with `count` arguments satisfies this arity
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(expected) => expected == count,
            Arity::Variadic => true,
        }
    }

    /// True when an event of arity `self` can be delivered to a handler of arity `other`
    pub fn is_compatible(self, other: Arity) -> bool {
        match (self, other) {
            (Arity::Fixed(a), Arity::Fixed(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "variadic"),
        }
    }
}

type Invoker = dyn Fn(&[Variant]) -> Result<(), DispatchError>;

/// A registered event handler with a fixed arity
#[derive(Clone)]
pub struct Handler {
    arity: Arity,
    /// Set only for zero-sized callables
    callable: Option<TypeId>,
    callable_name: &'static str,
    invoker: Rc<Invoker>,
}

impl Handler {
    /// Build a handler from a typed closure or function of 0 to 6 parameters
    ///
    /// ```rust,ignore
    /// let on_toggled = Handler::new(|pressed: bool| println!("pressed: {}", pressed));
    /// ```
    pub fn new<Args, F>(callable: F) -> Self
    where
        F: IntoHandler<Args>,
    {
        callable.into_handler()
    }

    /// Build a handler that receives the raw argument sequence
    pub fn variadic<F>(callable: F) -> Self
    where
        F: Fn(&[Variant]) + 'static,
    {
        Self::from_parts::<F, _>(Arity::Variadic, move |args: &[Variant]| {
            callable(args);
            Ok(())
        })
    }

    fn from_parts<F: 'static, I>(arity: Arity, invoker: I) -> Self
    where
        I: Fn(&[Variant]) -> Result<(), DispatchError> + 'static,
    {
        Self {
            arity,
            callable: (mem::size_of::<F>() == 0).then(TypeId::of::<F>),
            callable_name: type_name::<F>(),
            invoker: Rc::new(invoker),
        }
    }

    /// Declared arity
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Type name of the wrapped callable, for diagnostics
    pub fn callable_name(&self) -> &'static str {
        self.callable_name
    }

    /// True when both handles refer to the same handler instance
    pub fn same_instance(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.invoker, &other.invoker)
    }

    /// True when both handlers wrap the same stateless callable
    pub fn same_callable(&self, other: &Handler) -> bool {
        match (self.callable, other.callable) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Reference match, falling back to a structural match
    pub fn matches(&self, other: &Handler) -> bool {
        self.same_instance(other) || self.same_callable(other)
    }

    /// Validate `args` against the declared signature and call the handler
    pub fn invoke(&self, args: &[Variant]) -> Result<(), DispatchError> {
        if let Arity::Fixed(expected) = self.arity {
            if args.len() != expected {
                return Err(DispatchError::ArityMismatch {
                    expected,
                    actual: args.len(),
                });
            }
        }
        (self.invoker)(args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("arity", &self.arity)
            .field("callable", &self.callable_name)
            .finish()
    }
}

/// Conversion of a typed callable into a [`Handler`].
///
/// Implemented for every `Fn` of 0 to 6 parameters whose parameter types
/// implement [`FromVariant`]. `Args` is the parameter tuple.
pub trait IntoHandler<Args> {
    fn into_handler(self) -> Handler;
}

fn extract<T: FromVariant>(args: &[Variant], position: usize) -> Result<T, DispatchError> {
    let value = args.get(position).ok_or(DispatchError::ArityMismatch {
        expected: position + 1,
        actual: args.len(),
    })?;
    T::from_variant(value).ok_or(DispatchError::ArgumentType {
        position,
        expected: T::TYPE_NAME,
        actual: value.type_name(),
    })
}

macro_rules! impl_into_handler {
    ($count:literal $(, $param:ident $value:ident $position:literal)*) => {
        impl<Func, $($param,)*> IntoHandler<($($param,)*)> for Func
        where
            Func: Fn($($param),*) + 'static,
            $($param: FromVariant + 'static,)*
        {
            #[allow(unused_variables)]
            fn into_handler(self) -> Handler {
                Handler::from_parts::<Func, _>(Arity::Fixed($count), move |args: &[Variant]| {
                    $(let $value = extract::<$param>(args, $position)?;)*
                    self($($value),*);
                    Ok(())
                })
            }
        }
    };
}

impl_into_handler!(0);
impl_into_handler!(1, A a 0);
impl_into_handler!(2, A a 0, B b 1);
impl_into_handler!(3, A a 0, B b 1, C c 2);
impl_into_handler!(4, A a 0, B b 1, C c 2, D d 3);
impl_into_handler!(5, A a 0, B b 1, C c 2, D d 3, E e 4);
impl_into_handler!(6, A a 0, B b 1, C c 2, D d 3, E e 4, F f 5);

/// Binds a subscription's handler to an emitter's firing path.
///
/// Emitters hold dispatchers in their connection lists and call
/// [`Dispatcher::dispatch`] for each live one when an event fires.
#[derive(Debug)]
pub struct Dispatcher {
    subscription: Subscription,
}

impl Dispatcher {
    pub(crate) fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// The subscription this dispatcher delivers for
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn handler(&self) -> &Handler {
        self.subscription.handler()
    }

    /// False once the subscription has been disconnected
    pub fn is_live(&self) -> bool {
        self.subscription.is_connected()
    }

    /// Deliver one firing
    pub fn dispatch(&self, args: &[Variant]) -> Result<(), DispatchError> {
        self.handler().invoke(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::variant::Vector3;
    use signalkit_core::{shared, shared_vec};

    fn on_pressed() {}

    fn on_released() {}

    fn recreated_closure() -> Handler {
        Handler::new(|value: i64| assert!(value >= 0))
    }

    fn capturing_closure(log: signalkit_core::SharedVec<i64>) -> Handler {
        Handler::new(move |value: i64| log.borrow_mut().push(value))
    }

    #[test]
    fn test_typed_invocation() {
        let seen = shared_vec();
        let sink = seen.clone();
        let handler = Handler::new(move |name: String, count: i32| {
            sink.borrow_mut().push(format!("{}={}", name, count));
        });

        assert_eq!(handler.arity(), Arity::Fixed(2));
        handler.invoke(&args!["speed", 3]).unwrap();
        assert_eq!(*seen.borrow(), vec!["speed=3".to_string()]);
    }

    #[test]
    fn test_arity_mismatch_does_not_invoke() {
        let calls = shared(0);
        let counter = calls.clone();
        let handler = Handler::new(move |_pressed: bool| *counter.borrow_mut() += 1);

        let err = handler.invoke(&args![true, false]).unwrap_err();
        assert_eq!(
            err,
            DispatchError::ArityMismatch {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_argument_type_names_position() {
        let calls = shared(0);
        let counter = calls.clone();
        let handler = Handler::new(move |_a: i64, _b: bool, _c: f64| *counter.borrow_mut() += 1);

        let err = handler.invoke(&args![1, "yes", 2.0]).unwrap_err();
        assert_eq!(
            err,
            DispatchError::ArgumentType {
                position: 1,
                expected: "bool",
                actual: "string"
            }
        );
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_zero_and_six_arity() {
        let calls = shared(0);
        let counter = calls.clone();
        let none = Handler::new(move || *counter.borrow_mut() += 1);
        assert_eq!(none.arity(), Arity::Fixed(0));
        none.invoke(&[]).unwrap();

        let counter = calls.clone();
        let six = Handler::new(
            move |_a: bool, _b: i64, _c: f64, _d: String, _e: Vector3, _f: Option<i64>| {
                *counter.borrow_mut() += 10;
            },
        );
        assert_eq!(six.arity(), Arity::Fixed(MAX_ARITY));
        six.invoke(&args![true, 1, 1.0, "s", Vector3::new(0.0, 1.0, 2.0), ()])
            .unwrap();

        assert_eq!(*calls.borrow(), 11);
    }

    #[test]
    fn test_variadic_passes_arguments_through() {
        let seen = shared_vec();
        let sink = seen.clone();
        let handler = Handler::variadic(move |args: &[Variant]| {
            sink.borrow_mut().extend(args.iter().cloned());
        });

        assert_eq!(handler.arity(), Arity::Variadic);
        handler.invoke(&[]).unwrap();
        handler.invoke(&args![1, "two", ()]).unwrap();
        assert_eq!(*seen.borrow(), args![1, "two", ()]);
    }

    #[test]
    fn test_identity_by_reference() {
        let handler = Handler::new(|| {});
        let clone = handler.clone();
        assert!(handler.same_instance(&clone));
        assert!(handler.matches(&clone));
    }

    #[test]
    fn test_identity_same_function_item() {
        let first = Handler::new(on_pressed);
        let second = Handler::new(on_pressed);
        assert!(!first.same_instance(&second));
        assert!(first.same_callable(&second));
        assert!(first.matches(&second));
    }

    #[test]
    fn test_identity_same_closure_expression() {
        let first = recreated_closure();
        let second = recreated_closure();
        assert!(!first.same_instance(&second));
        assert!(first.matches(&second));
    }

    #[test]
    fn test_capturing_closures_match_only_by_reference() {
        let log = shared_vec();
        let first = capturing_closure(log.clone());
        let second = capturing_closure(log);
        assert!(!first.same_callable(&second));
        assert!(!first.matches(&second));
        assert!(first.matches(&first.clone()));
    }

    #[test]
    fn test_function_pointers_are_told_apart() {
        let pointers: [fn(); 2] = [on_pressed, on_released];
        let first = Handler::new(pointers[0]);
        let second = Handler::new(pointers[1]);
        assert!(!first.matches(&second));

        // Even the same pointer value only matches by reference.
        assert!(!Handler::new(pointers[0]).matches(&first));
    }

    #[test]
    fn test_boxed_variadic_closures_are_told_apart() {
        let boxed = |tag: i64| -> Box<dyn Fn(&[Variant])> {
            Box::new(move |args: &[Variant]| assert!(args.len() as i64 != tag))
        };
        let first = Handler::variadic(boxed(1));
        let second = Handler::variadic(boxed(2));
        assert!(!first.matches(&second));
    }

    #[test]
    fn test_distinct_closures_never_match() {
        let first = Handler::new(|| {});
        let second = Handler::new(|| {});
        assert!(!first.matches(&second));
        assert!(!Handler::new(on_pressed).matches(&first));
        assert!(!Handler::new(on_pressed).matches(&Handler::new(on_released)));
    }

    #[test]
    fn test_arity_compatibility() {
        assert!(Arity::Fixed(2).is_compatible(Arity::Fixed(2)));
        assert!(!Arity::Fixed(2).is_compatible(Arity::Fixed(1)));
        assert!(Arity::Variadic.is_compatible(Arity::Fixed(3)));
        assert!(Arity::Fixed(0).is_compatible(Arity::Variadic));
        assert!(Arity::Variadic.accepts(5));
        assert_eq!(Arity::Variadic.to_string(), "variadic");
    }
}
