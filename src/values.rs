//! Scalar values which form a computation graph
use std::{
    cell::RefCell,
    collections::HashSet,
    fmt::{self, Debug, Display},
    iter::Sum,
    ops::{Add, Mul, Neg, Sub},
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::backprop_fns::{
    BackpropFunc, update_gradients_one_operand, update_gradients_two_operands,
};

type SharedValue = Rc<RefCell<InnerValue>>;

/// Source of node identities, shared by every thread constructing values
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Newtype representing a shared value in a computation graph
#[derive(Debug, Clone)]
pub struct Value(pub(crate) SharedValue);

impl Value {
    /// Create a new value, not derived from any other values
    pub fn new(data: f64) -> Self {
        Self(Rc::new(RefCell::new(InnerValue::new(data, None, vec![]))))
    }

    /// Create a new value derived from an operation on other values (i.e. not a leaf node)
    fn new_derived(data: f64, backprop_fn: BackpropFunc, operands: Vec<Value>) -> Self {
        debug_assert_eq!(backprop_fn.n_operands(), operands.len());
        let operands = operands.into_iter().map(|v| v.0).collect();
        Self(Rc::new(RefCell::new(InnerValue::new(
            data,
            Some(backprop_fn),
            operands,
        ))))
    }

    /// Names the value, returning it so construction can be chained
    pub fn with_label(self, label: &str) -> Self {
        self.set_label(label);
        self
    }

    pub fn set_label(&self, label: &str) {
        self.0.borrow_mut().label = Some(label.to_string());
    }

    pub fn label(&self) -> Option<String> {
        self.0.borrow().label.clone()
    }

    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    pub fn data(&self) -> f64 {
        self.0.borrow().data
    }

    pub fn grad(&self) -> f64 {
        self.0.borrow().grad
    }

    /// The operation which produced this value, `None` for leaves
    pub fn op(&self) -> Option<BackpropFunc> {
        self.0.borrow().backprop_fn
    }

    /// The values this one was computed from, in operand order
    pub fn operands(&self) -> Vec<Value> {
        self.0
            .borrow()
            .operands
            .iter()
            .map(|v| Value(v.clone()))
            .collect()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.borrow().operands.is_empty()
    }

    // Strictly, &mut isn't needed since the value is behind a shared mutable type,
    // but it indicates that the value should be exclusively mutable.
    // Only meaningful on leaves: derived values are not recomputed.
    pub fn set_data(&mut self, data: f64) {
        debug_assert!(self.is_leaf(), "set_data called on a derived value");
        self.0.borrow_mut().data = data;
    }

    /// Identifier used when drawing the node, `<label>_<id>` or just `<id>`
    pub fn node_id(&self) -> String {
        let inner = self.0.borrow();
        match &inner.label {
            Some(label) => format!("{}_{}", label, inner.id),
            None => format!("{}", inner.id),
        }
    }

    /// Record-style label showing the name, data and gradient of the node
    pub fn graph_label(&self) -> String {
        let inner = self.0.borrow();
        format!(
            "{{ {} | d {:.4} | g {:.4} }}",
            inner.label.as_deref().unwrap_or(""),
            inner.data,
            inner.grad
        )
    }

    /// Unlike PyTorch which only zeros out the gradients of the leaf nodes, this zeros out
    /// all gradients in the computation graph reachable from this node, including its own
    pub fn zero_grad(&mut self) {
        for value in self.topological_order() {
            value.0.borrow_mut().grad = 0.0;
        }
    }

    /// Accumulates the gradient of this value into every value it depends on.
    ///
    /// Gradients are added to, not overwritten: call `zero_grad` first when the same
    /// graph is backpropagated more than once.
    pub fn backward(&self) {
        let backprop_order = self.topological_order();

        // d out / d out = 1
        self.0.borrow_mut().grad = 1.0;

        // apply backprop, reversed to start from root first
        for value in backprop_order.into_iter().rev() {
            let operands = value.operands();
            if let Some(f) = value.op() {
                debug_assert!(f.n_operands() == operands.len());
            }
            match operands.as_slice() {
                [] => {}
                [in1] => update_gradients_one_operand(in1, &value),
                [in1, in2] => update_gradients_two_operands(in1, in2, &value),
                _ => {
                    panic!("Unsupported number of operands: {}", operands.len());
                }
            }
        }
    }

    /// Every value reachable from this one, each exactly once, ordered so that a value
    /// always comes after all of its operands. This value is last.
    ///
    /// The walk is a post order depth first search with an explicit stack, so deep
    /// graphs don't exhaust the call stack.
    pub fn topological_order(&self) -> Vec<Value> {
        let mut order = vec![];
        let mut visited: HashSet<u64> = HashSet::new();
        // (value, operands already pushed)
        let mut stack = vec![(self.clone(), false)];

        while let Some((value, expanded)) = stack.pop() {
            if expanded {
                order.push(value);
                continue;
            }
            if !visited.insert(value.id()) {
                continue;
            }
            let operands = value.operands();
            stack.push((value, true));
            // reversed so the first operand is visited first
            for operand in operands.into_iter().rev() {
                if !visited.contains(&operand.id()) {
                    stack.push((operand, false));
                }
            }
        }
        order
    }
}

// Various operations on values
impl Value {
    /// Raises the value to a constant power
    pub fn pow(&self, n: f64) -> Value {
        Value::new_derived(self.data().powf(n), BackpropFunc::Pow(n), vec![self.clone()])
    }

    /// Hyperbolic tangent, `(e^2x - 1) / (e^2x + 1)`. Saturates at +-1 for large inputs.
    pub fn tanh(&self) -> Value {
        Value::new_derived(self.data().tanh(), BackpropFunc::Tanh, vec![self.clone()])
    }
}

// pretty print the graph behind a value in a JSON-like format, one entry per node in
// topological order, operands referenced by id so shared nodes are printed once
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self.topological_order();
        writeln!(f, "[")?;
        for (i, value) in order.iter().enumerate() {
            let inner = value.0.borrow();
            writeln!(f, "  {{")?;
            if let Some(label) = &inner.label {
                writeln!(f, "    \"label\": {:?},", label)?;
            }
            writeln!(f, "    \"data\": {},", inner.data)?;
            writeln!(f, "    \"grad\": {},", inner.grad)?;
            writeln!(f, "    \"id\": {},", inner.id)?;
            writeln!(f, "    \"backprop_fn\": {:?},", inner.backprop_fn)?;
            let operand_ids = inner
                .operands
                .iter()
                .map(|o| o.borrow().id.to_string())
                .collect::<Vec<_>>();
            writeln!(f, "    \"operands\": [{}]", operand_ids.join(", "))?;
            if i < order.len() - 1 {
                writeln!(f, "  }},")?;
            } else {
                writeln!(f, "  }}")?;
            }
        }
        write!(f, "]")
    }
}

impl Add for &Value {
    type Output = Value;

    fn add(self, other: &Value) -> Value {
        Value::new_derived(
            self.data() + other.data(),
            BackpropFunc::Add,
            vec![self.clone(), other.clone()],
        )
    }
}

impl Mul for &Value {
    type Output = Value;

    fn mul(self, other: &Value) -> Value {
        Value::new_derived(
            self.data() * other.data(),
            BackpropFunc::Mul,
            vec![self.clone(), other.clone()],
        )
    }
}

/// `-a` is recorded as `a * -1`
impl Neg for &Value {
    type Output = Value;

    fn neg(self) -> Value {
        self * &Value::new(-1.0)
    }
}

/// `a - b` is recorded as `a + (b * -1)`, there is no subtraction node
impl Sub for &Value {
    type Output = Value;

    fn sub(self, other: &Value) -> Value {
        self + &(-other)
    }
}

impl Sum for Value {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Value::new(0.0), |acc, v| acc + v)
    }
}

/// Convenience macro to implement operations on `[Value]` when ownership can be transferred
macro_rules! impl_arithmetic(
    ($trait:ident, $trait_method:ident, $operator:tt, $struct:ident) => {
        impl $trait for $struct {
            type Output = Self;

            fn $trait_method(self, other: Self) -> Self {
                &self $operator &other
            }
        }
    }
);
impl_arithmetic!(Add, add, +, Value);
impl_arithmetic!(Sub, sub, -, Value);
impl_arithmetic!(Mul, mul, *, Value);

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        -&self
    }
}

/// Two handles are equal when they point at the same node, equal data is not enough
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Value {}

// unfortunate that there isn't a blanket impl for AsRef<T> for T
// <https://doc.rust-lang.org/std/convert/trait.AsRef.html#reflexivity>
impl AsRef<Value> for Value {
    fn as_ref(&self) -> &Value {
        self
    }
}

pub(crate) struct InnerValue {
    pub(crate) data: f64,
    /// gradient of the output with respect to the value
    pub(crate) grad: f64,
    /// List of the node inputs in the forward pass, never changed after construction
    operands: Vec<SharedValue>,
    /// Unique identifier for the node
    id: u64,
    /// The function which created this value from its operands
    /// `None` when the value is a leaf node
    pub(crate) backprop_fn: Option<BackpropFunc>,
    /// Cosmetic name, only used when displaying the graph
    label: Option<String>,
}

impl InnerValue {
    fn new(data: f64, backprop_fn: Option<BackpropFunc>, operands: Vec<SharedValue>) -> Self {
        Self {
            data,
            grad: 0.0,
            operands,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            backprop_fn,
            label: None,
        }
    }
}

// operands are shown by id, printing them in full would walk the whole graph
impl Debug for InnerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerValue")
            .field("data", &self.data)
            .field("grad", &self.grad)
            .field(
                "operands",
                &self
                    .operands
                    .iter()
                    .map(|o| o.borrow().id)
                    .collect::<Vec<_>>(),
            )
            .field("id", &self.id)
            .field("backprop_fn", &self.backprop_fn)
            .field("label", &self.label)
            .finish()
    }
}

// The default drop recurses through `operands` once per level of the graph.
// Unlink uniquely owned operands onto a work list instead.
impl Drop for InnerValue {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.operands);
        while let Some(operand) = stack.pop() {
            if let Ok(cell) = Rc::try_unwrap(operand) {
                let mut inner = cell.into_inner();
                stack.append(&mut inner.operands);
            }
        }
    }
}
