//! Loss function(s)

use crate::values::Value;

/// Sum of squared errors between two vectors of values of the same length
pub struct SSELoss;

impl SSELoss {
    pub fn call<T, U>(y_pred: &[T], y_true: &[U]) -> Value
    where
        T: AsRef<Value>,
        U: AsRef<Value>,
    {
        debug_assert_eq!(
            y_pred.len(),
            y_true.len(),
            "predictions and targets differ in length"
        );
        y_pred
            .iter()
            .zip(y_true.iter())
            .map(|(a, b)| (a.as_ref() - b.as_ref()).pow(2.0))
            .sum::<Value>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_loss() {
        let y_pred = vec![Value::new(2.0), Value::new(3.0)];
        let y_true = vec![Value::new(1.0), Value::new(5.0)];
        let loss = SSELoss::call(&y_pred, &y_true);
        assert_eq!(loss.data(), 5.0);

        loss.backward();
        // dloss / dy_pred = 2 * (y_pred - y_true)
        // dloss / dy_true = -2 * (y_pred - y_true)
        assert_eq!(y_pred[0].grad(), 2.0);
        assert_eq!(y_pred[1].grad(), -4.0);
        assert_eq!(y_true[0].grad(), -2.0);
        assert_eq!(y_true[1].grad(), 4.0);
    }

    #[test]
    fn test_sse_loss_empty() {
        let empty: Vec<Value> = vec![];
        let loss = SSELoss::call(&empty, &empty);
        assert_eq!(loss.data(), 0.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "predictions and targets differ in length")]
    fn test_sse_loss_length_mismatch() {
        let y_pred = vec![Value::new(2.0), Value::new(3.0)];
        let y_true = vec![Value::new(1.0)];
        SSELoss::call(&y_pred, &y_true);
    }
}
