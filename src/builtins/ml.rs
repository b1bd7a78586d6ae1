use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::{double_or, get_double, get_doubles, get_integer, get_list},
    random,
    value::{ListValue, Value},
};

pub const NAMES: &[(&str, Arity)] = &[
    ("__dropout__", Arity::Range(1, 2)),
    ("__weight_decay__", Arity::Range(1, 2)),
    ("__l1_lasso__", Arity::Range(1, 2)),
    ("__l2_ridge__", Arity::Range(1, 2)),
    ("__elastic_net__", Arity::Range(1, 3)),
    ("__rmsprop__", Arity::Range(3, 5)),
    ("__adadelta__", Arity::Range(4, 6)),
    ("__adagrad__", Arity::Range(3, 5)),
    ("__adamax__", Arity::Range(4, 8)),
    ("__adam__", Arity::Range(4, 9)),
    ("__nadam__", Arity::Range(4, 9)),
    ("__sgd__", Arity::Range(3, 5)),
    ("__sgd_nesterov__", Arity::Range(3, 5)),
    ("__binary_crossentropy__", Arity::Range(2, 3)),
    ("__binary_focal_loss__", Arity::Range(2, 5)),
    ("__categorical_crossentropy__", Arity::Range(2, 3)),
    ("__cosine_similarity__", Arity::Exact(2)),
];

const EPSILON: f64 = f64::EPSILON;

pub fn execute(entry: &BuiltinEntry, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    match name {
        "__dropout__" => dropout(name, args, span),
        "__weight_decay__" => {
            let rate = double_or(name, args, 1, 0.01, span)?;
            let weights = Slots::read(name, &args[0], span)?;
            let decayed = weights.values.iter().map(|w| w - rate * w).collect();
            weights.store(decayed);
            Ok(args[0].clone())
        }
        "__l1_lasso__" => {
            let lambda = double_or(name, args, 1, 0.01, span)?;
            Ok(Value::Float(l1(name, &args[0], lambda, span)?))
        }
        "__l2_ridge__" => {
            let lambda = double_or(name, args, 1, 0.01, span)?;
            Ok(Value::Float(l2(name, &args[0], lambda, span)?))
        }
        "__elastic_net__" => {
            let lambda1 = double_or(name, args, 1, 0.01, span)?;
            let lambda2 = double_or(name, args, 2, 0.01, span)?;
            let total = l1(name, &args[0], lambda1, span)? + l2(name, &args[0], lambda2, span)?;
            Ok(Value::Float(total))
        }
        "__rmsprop__" => rmsprop(name, args, span),
        "__adadelta__" => adadelta(name, args, span),
        "__adagrad__" => adagrad(name, args, span),
        "__adamax__" => adamax(name, args, span),
        "__adam__" => adam(name, args, span, false),
        "__nadam__" => adam(name, args, span, true),
        "__sgd__" => sgd(name, args, span, false),
        "__sgd_nesterov__" => sgd(name, args, span, true),
        "__binary_crossentropy__" => {
            let eps = double_or(name, args, 2, EPSILON, span)?;
            let truth = get_double(name, &args[0], span)?;
            let pred = clamp_probability(get_double(name, &args[1], span)?, eps);
            Ok(Value::Float(
                -(truth * pred.ln() + (1.0 - truth) * (1.0 - pred).ln()),
            ))
        }
        "__binary_focal_loss__" => {
            let gamma = double_or(name, args, 2, 2.0, span)?;
            let alpha = double_or(name, args, 3, 0.25, span)?;
            let eps = double_or(name, args, 4, EPSILON, span)?;
            let truth = get_double(name, &args[0], span)?;
            let pred = clamp_probability(get_double(name, &args[1], span)?, eps);
            let loss = if truth == 1.0 {
                -alpha * (1.0 - pred).powf(gamma) * pred.ln()
            } else {
                -(1.0 - alpha) * pred.powf(gamma) * (1.0 - pred).ln()
            };
            Ok(Value::Float(loss))
        }
        "__categorical_crossentropy__" => {
            let eps = double_or(name, args, 2, EPSILON, span)?;
            let (truth, pred) = paired(name, &args[0], &args[1], span)?;
            let loss = truth
                .iter()
                .zip(&pred)
                .fold(0.0, |loss, (t, p)| loss - t * p.max(eps).ln());
            Ok(Value::Float(loss))
        }
        "__cosine_similarity__" => cosine_similarity(name, args, span),
        _ => Err(RuntimeError::UnknownBuiltin {
            span: span.clone(),
            name: name.to_string(),
        }),
    }
}

/// Numeric view of a list argument that is written back in place.
struct Slots {
    list: ListValue,
    values: Vec<f64>,
}

impl Slots {
    fn read(name: &str, value: &Value, span: &Span) -> RuntimeResult<Self> {
        Ok(Slots {
            list: get_list(name, value, span)?,
            values: get_doubles(name, value, span)?,
        })
    }

    fn store(&self, values: Vec<f64>) {
        let mut items = self.list.items.borrow_mut();
        *items = values.into_iter().map(Value::Float).collect();
    }
}

fn read_all(name: &str, args: &[Value], count: usize, span: &Span) -> RuntimeResult<Vec<Slots>> {
    let slots = args[..count]
        .iter()
        .map(|value| Slots::read(name, value, span))
        .collect::<RuntimeResult<Vec<_>>>()?;
    let len = slots[0].values.len();
    if slots.iter().any(|slot| slot.values.len() != len) {
        return Err(RuntimeError::invalid_operation(
            span,
            format!("all lists passed to {name} must be the same size"),
        ));
    }
    if len == 0 {
        return Err(RuntimeError::empty_list(
            span,
            format!("{name} expects non-empty lists"),
        ));
    }
    Ok(slots)
}

fn paired(
    name: &str,
    truth: &Value,
    pred: &Value,
    span: &Span,
) -> RuntimeResult<(Vec<f64>, Vec<f64>)> {
    let truth = get_doubles(name, truth, span)?;
    let pred = get_doubles(name, pred, span)?;
    if truth.len() != pred.len() {
        return Err(RuntimeError::invalid_operation(
            span,
            format!("all lists passed to {name} must be the same size"),
        ));
    }
    if truth.is_empty() {
        return Err(RuntimeError::empty_list(
            span,
            format!("{name} expects non-empty lists"),
        ));
    }
    Ok((truth, pred))
}

fn clamp_probability(p: f64, eps: f64) -> f64 {
    p.min(1.0 - eps).max(eps)
}

fn dropout(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let rate = double_or(name, args, 1, 0.5, span)?;
    let list = get_list(name, &args[0], span)?;
    for item in list.items.borrow_mut().iter_mut() {
        if random::random_float(0.0, 1.0) < rate {
            *item = Value::Float(0.0);
        }
    }
    Ok(args[0].clone())
}

fn l1(name: &str, weights: &Value, lambda: f64, span: &Span) -> RuntimeResult<f64> {
    let weights = get_doubles(name, weights, span)?;
    Ok(lambda * weights.iter().map(|w| w.abs()).sum::<f64>())
}

fn l2(name: &str, weights: &Value, lambda: f64, span: &Span) -> RuntimeResult<f64> {
    let weights = get_doubles(name, weights, span)?;
    Ok(lambda * weights.iter().map(|w| w * w).sum::<f64>())
}

// weights, gradients, v, [learning rate, decay]
fn rmsprop(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let lr = double_or(name, args, 3, 0.001, span)?;
    let decay = double_or(name, args, 4, 0.9, span)?;
    let slots = read_all(name, args, 3, span)?;
    let (weights, grads, v) = (&slots[0].values, &slots[1].values, &slots[2].values);
    let mut new_w = Vec::with_capacity(weights.len());
    let mut new_v = Vec::with_capacity(weights.len());
    for i in 0..weights.len() {
        let g = grads[i];
        let vi = decay * v[i] + (1.0 - decay) * g * g;
        new_v.push(vi);
        new_w.push(weights[i] - lr * g / (vi.sqrt() + EPSILON));
    }
    slots[2].store(new_v);
    slots[0].store(new_w);
    Ok(args[0].clone())
}

// weights, gradients, accumulated gradients, accumulated updates, [rho, epsilon]
fn adadelta(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let rho = double_or(name, args, 4, 0.95, span)?;
    let eps = double_or(name, args, 5, 1e-6, span)?;
    let slots = read_all(name, args, 4, span)?;
    let weights = &slots[0].values;
    let grads = &slots[1].values;
    let mut accum_grad = slots[2].values.clone();
    let mut accum_update = slots[3].values.clone();
    let mut new_w = Vec::with_capacity(weights.len());
    for i in 0..weights.len() {
        let g = grads[i];
        accum_grad[i] = rho * accum_grad[i] + (1.0 - rho) * g * g;
        let update = ((accum_update[i] + eps) / (accum_grad[i] + eps)).sqrt() * g;
        accum_update[i] = rho * accum_update[i] + (1.0 - rho) * update * update;
        new_w.push(weights[i] - update);
    }
    slots[2].store(accum_grad);
    slots[3].store(accum_update);
    slots[0].store(new_w);
    Ok(args[0].clone())
}

// weights, gradients, v, [learning rate, epsilon]
fn adagrad(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let lr = double_or(name, args, 3, 0.01, span)?;
    let eps = double_or(name, args, 4, EPSILON, span)?;
    let slots = read_all(name, args, 3, span)?;
    let (weights, grads) = (&slots[0].values, &slots[1].values);
    let mut v = slots[2].values.clone();
    let mut new_w = Vec::with_capacity(weights.len());
    for i in 0..weights.len() {
        let g = grads[i];
        v[i] += g * g;
        new_w.push(weights[i] - lr * g / (v[i].sqrt() + eps));
    }
    slots[2].store(v);
    slots[0].store(new_w);
    Ok(args[0].clone())
}

// weights, gradients, m, v, [learning rate, beta1, beta2, epsilon]
fn adamax(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let lr = double_or(name, args, 4, 0.02, span)?;
    let beta1 = double_or(name, args, 5, 0.9, span)?;
    let beta2 = double_or(name, args, 6, 0.999, span)?;
    let eps = double_or(name, args, 7, EPSILON, span)?;
    let slots = read_all(name, args, 4, span)?;
    let (weights, grads) = (&slots[0].values, &slots[1].values);
    let mut m = slots[2].values.clone();
    let mut v = slots[3].values.clone();
    let mut new_w = Vec::with_capacity(weights.len());
    for i in 0..weights.len() {
        let g = grads[i];
        m[i] = beta1 * m[i] + (1.0 - beta1) * g;
        v[i] = (beta2 * v[i]).max(g.abs());
        new_w.push(weights[i] - lr * m[i] / (v[i] + eps));
    }
    slots[2].store(m);
    slots[3].store(v);
    slots[0].store(new_w);
    Ok(args[0].clone())
}

// weights, gradients, m, v, [learning rate, beta1, beta2, t, epsilon]
fn adam(name: &str, args: &[Value], span: &Span, nesterov: bool) -> RuntimeResult<Value> {
    let lr = double_or(name, args, 4, 0.02, span)?;
    let beta1 = double_or(name, args, 5, 0.9, span)?;
    let beta2 = double_or(name, args, 6, 0.999, span)?;
    let t = match args.get(7) {
        Some(value) => get_integer(name, value, span)?,
        None => 1,
    };
    let eps = double_or(name, args, 8, EPSILON, span)?;
    let slots = read_all(name, args, 4, span)?;
    let (weights, grads) = (&slots[0].values, &slots[1].values);
    let mut m = slots[2].values.clone();
    let mut v = slots[3].values.clone();
    let mut new_w = Vec::with_capacity(weights.len());
    let steps = t as i32;
    let beta1_t = beta1 * (1.0 - 0.1f64.powf(t as f64 / 1000.0));
    for i in 0..weights.len() {
        let g = grads[i];
        m[i] = beta1 * m[i] + (1.0 - beta1) * g;
        v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
        let step = if nesterov {
            let m_hat = m[i] / (1.0 - beta1_t);
            let v_hat = v[i] / (1.0 - beta2);
            lr * (beta1 * m_hat + (1.0 - beta1) * g) / (v_hat.sqrt() + eps)
        } else {
            let m_hat = m[i] / (1.0 - beta1.powi(steps));
            let v_hat = v[i] / (1.0 - beta2.powi(steps));
            lr * m_hat / (v_hat.sqrt() + eps)
        };
        new_w.push(weights[i] - step);
    }
    slots[2].store(m);
    slots[3].store(v);
    slots[0].store(new_w);
    Ok(args[0].clone())
}

// weights, gradients, velocity, [learning rate, momentum]
fn sgd(name: &str, args: &[Value], span: &Span, nesterov: bool) -> RuntimeResult<Value> {
    let lr = double_or(name, args, 3, 0.01, span)?;
    let momentum = double_or(name, args, 4, 0.0, span)?;
    let slots = read_all(name, args, 3, span)?;
    let (weights, grads) = (&slots[0].values, &slots[1].values);
    let mut velocity = slots[2].values.clone();
    let mut new_w = Vec::with_capacity(weights.len());
    for i in 0..weights.len() {
        let lookahead = if nesterov {
            weights[i] + momentum * velocity[i]
        } else {
            weights[i]
        };
        velocity[i] = momentum * velocity[i] - lr * grads[i];
        new_w.push(lookahead + velocity[i]);
    }
    slots[2].store(velocity);
    slots[0].store(new_w);
    Ok(args[0].clone())
}

fn cosine_similarity(name: &str, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    let (truth, pred) = paired(name, &args[0], &args[1], span)?;
    let dot: f64 = truth.iter().zip(&pred).map(|(t, p)| t * p).sum();
    let norm_true = truth.iter().map(|t| t * t).sum::<f64>().sqrt();
    let norm_pred = pred.iter().map(|p| p * p).sum::<f64>().sqrt();
    if norm_true == 0.0 {
        return Err(RuntimeError::invalid_operation(
            span,
            "the list of actual values is a zero vector",
        ));
    }
    if norm_pred == 0.0 {
        return Err(RuntimeError::invalid_operation(
            span,
            "the list of predicted values is a zero vector",
        ));
    }
    Ok(Value::Float(dot / (norm_true * norm_pred)))
}
