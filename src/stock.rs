//! Stock entity classes
//!
//! A few small classes that are always available to the CLI and handy for
//! exercising a dispatcher end to end.

use anyhow::Context;
use std::fmt::{self, Write};

use crate::graph::entity::{EntityBuilder, EntityClass};
use crate::graph::factory::ClassCatalog;
use crate::graph::value::{Value, ValueType};

/// Register every stock class into `catalog`.
pub fn register_stock(catalog: &ClassCatalog) {
    catalog.register_class::<Adder>();
    catalog.register_class::<Multiplier>();
    catalog.register_class::<Constant>();
}

fn int_arg(args: &[Value], index: usize) -> anyhow::Result<i32> {
    args.get(index)
        .and_then(Value::as_int)
        .with_context(|| format!("argument {} is not an int", index + 1))
}

fn double_arg(args: &[Value], index: usize) -> anyhow::Result<f64> {
    args.get(index)
        .and_then(Value::as_double)
        .with_context(|| format!("argument {} is not a double", index + 1))
}

/// Integer adder.
#[derive(Debug, Default)]
pub struct Adder {
    last: Option<i32>,
}

impl EntityClass for Adder {
    const CLASS_NAME: &'static str = "Adder";
    const DOCSTRING: &'static str = "Adds two integers";

    fn construct(_name: &str) -> anyhow::Result<Self> {
        Ok(Self::default())
    }

    fn describe(builder: &mut EntityBuilder<Self>) {
        builder
            .input("in1", ValueType::Int)
            .input("in2", ValueType::Int)
            .output("sout", ValueType::Int)
            .command(
                "add",
                vec![ValueType::Int, ValueType::Int],
                "Return the sum of two integers",
                |adder: &mut Adder, args| {
                    let (lhs, rhs) = (int_arg(args, 0)?, int_arg(args, 1)?);
                    let sum = lhs
                        .checked_add(rhs)
                        .with_context(|| format!("{lhs} + {rhs} overflows int"))?;
                    adder.last = Some(sum);
                    Ok(Value::Int(sum))
                },
            );
    }

    fn display(&self, out: &mut dyn Write) -> fmt::Result {
        match self.last {
            Some(sum) => writeln!(out, "  last sum: {sum}"),
            None => Ok(()),
        }
    }
}

/// Scaled floating point multiplier.
#[derive(Debug)]
pub struct Multiplier {
    gain: f64,
}

impl EntityClass for Multiplier {
    const CLASS_NAME: &'static str = "Multiplier";
    const DOCSTRING: &'static str = "Multiplies two doubles and scales the product by a gain";

    fn construct(_name: &str) -> anyhow::Result<Self> {
        Ok(Self { gain: 1.0 })
    }

    fn describe(builder: &mut EntityBuilder<Self>) {
        builder
            .input("sin1", ValueType::Double)
            .input("sin2", ValueType::Double)
            .output("sout", ValueType::Double)
            .command(
                "multiply",
                vec![ValueType::Double, ValueType::Double],
                "Return gain * lhs * rhs",
                |multiplier: &mut Multiplier, args| {
                    let product = double_arg(args, 0)? * double_arg(args, 1)?;
                    Ok(Value::Double(multiplier.gain * product))
                },
            )
            .command(
                "setGain",
                vec![ValueType::Double],
                "Set the gain applied to products",
                |multiplier: &mut Multiplier, args| {
                    let gain = double_arg(args, 0)?;
                    anyhow::ensure!(gain.is_finite(), "gain must be finite, got {gain}");
                    multiplier.gain = gain;
                    Ok(Value::None)
                },
            )
            .command(
                "getGain",
                vec![],
                "Return the current gain",
                |multiplier: &mut Multiplier, _args| Ok(Value::Double(multiplier.gain)),
            );
    }

    fn display(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "  gain: {}", self.gain)
    }
}

/// Holds an arbitrary sequence of values.
#[derive(Debug)]
pub struct Constant {
    value: Vec<Value>,
}

impl EntityClass for Constant {
    const CLASS_NAME: &'static str = "Constant";
    const DOCSTRING: &'static str = "Stores a sequence of values";

    fn construct(_name: &str) -> anyhow::Result<Self> {
        Ok(Self { value: Vec::new() })
    }

    fn describe(builder: &mut EntityBuilder<Self>) {
        builder
            .output("sout", ValueType::Values)
            .command(
                "set",
                vec![ValueType::Values],
                "Replace the stored values",
                |constant: &mut Constant, args| match args.first() {
                    Some(Value::Values(items)) => {
                        constant.value = items.clone();
                        Ok(Value::None)
                    }
                    _ => anyhow::bail!("argument 1 is not a values sequence"),
                },
            )
            .command(
                "get",
                vec![],
                "Return the stored values",
                |constant: &mut Constant, _args| Ok(Value::Values(constant.value.clone())),
            )
            .command(
                "size",
                vec![],
                "Return the number of stored values",
                |constant: &mut Constant, _args| {
                    let len = u32::try_from(constant.value.len()).context("too many values")?;
                    Ok(Value::Unsigned(len))
                },
            );
    }

    fn display(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "  value: {}", Value::Values(self.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Dispatcher;
    use crate::graph::dynamic::Dynamic;

    fn dispatcher() -> Dispatcher {
        let catalog = ClassCatalog::new();
        register_stock(&catalog);
        Dispatcher::new(catalog.snapshot())
    }

    #[test]
    fn stock_classes_are_listed() {
        assert_eq!(
            dispatcher().list_classes(),
            vec!["Adder", "Constant", "Multiplier"]
        );
    }

    #[test]
    fn adder_reports_overflow() {
        let dispatcher = dispatcher();
        let adder = dispatcher.create("Adder", "a").unwrap();
        let err = dispatcher
            .execute_command(adder, "add", &[Dynamic::Int(i64::from(i32::MAX)), Dynamic::Int(1)])
            .unwrap_err();
        assert!(err.to_string().contains("overflows int"));
    }

    #[test]
    fn multiplier_applies_gain() {
        let dispatcher = dispatcher();
        let m = dispatcher.create("Multiplier", "m").unwrap();
        dispatcher
            .execute_command(m, "setGain", &[Dynamic::Float(0.5)])
            .unwrap();
        let product = dispatcher
            .execute_command(m, "multiply", &[Dynamic::Float(3.0), Dynamic::Int(4)])
            .unwrap();
        assert_eq!(product, Dynamic::Float(6.0));
        assert!(dispatcher.display(m).unwrap().contains("gain: 0.5"));
    }

    #[test]
    fn constant_stores_nested_values() {
        let dispatcher = dispatcher();
        let c = dispatcher.create("Constant", "c").unwrap();
        let stored = Dynamic::List(vec![
            Dynamic::Int(1),
            Dynamic::Str("two".into()),
            Dynamic::List(vec![Dynamic::Float(3.5)]),
        ]);
        dispatcher
            .execute_command(c, "set", std::slice::from_ref(&stored))
            .unwrap();
        assert_eq!(dispatcher.execute_command(c, "get", &[]).unwrap(), stored);
        assert_eq!(
            dispatcher.execute_command(c, "size", &[]).unwrap(),
            Dynamic::Int(3)
        );
    }
}
