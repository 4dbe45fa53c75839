use lambdacalc::{
    ConversionExercise, Notation, StepKind, Tree, derivation, parse, parse_and_reduce, parse_type,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== lambdacalc Demo ===\n");

    // Types in both notations
    println!("Types:");
    for input in ["<e,t>", "<et>", "<e*e,t>", "<'a,<'a,t>>"] {
        let ty = parse_type(input)?;
        println!("  {input} -> {ty} / {}", ty.display(Notation::Ascii));
    }

    // ASCII and Unicode input parse to the same expression
    println!("\nExpressions:");
    for input in ["Lx.P(x) & ~Q(x)", "λx.P(x) ∧ ¬Q(x)", "Ax.Ey.R(x,y) -> P(x)"] {
        let expr = parse(input)?;
        println!("  {input} -> {expr} : {}", expr.get_type()?);
    }

    // Alpha-equivalence
    let left = parse("Lx.Ly.R(x,y)")?;
    let right = parse("Lz.Lw.R(z,w)")?;
    println!("\n  {left} ≡α {right}? {}", left.alpha_equivalent(&right));

    // Step-by-step conversion with an alpha variant
    println!("\nLambda conversion:");
    let expr = parse("(Lx.Ly.R(x,y))(y)")?;
    println!("     {expr}");
    for step in derivation(&expr, 100)? {
        let marker = match step.kind {
            StepKind::AlphaVariant => "α",
            StepKind::BetaReduction => "β",
        };
        println!("  {marker}  {}", step.result);
    }

    let result = parse_and_reduce("(LX.Lx.X(x) & Q(x))(Ly.P(y))", 100)?;
    println!("\n  (LX.Lx.X(x) & Q(x))(Ly.P(y)) -> {result}");

    // Composition of a small tree: [a [P Q]]
    println!("\nComposition:");
    let tree = Tree::branch(vec![
        Tree::leaf(parse("a")?),
        Tree::branch(vec![Tree::leaf(parse("P")?), Tree::leaf(parse("Q")?)]),
    ]);
    let composed = tree.interpret()?;
    println!("  {} by {}", composed.meaning, composed.rule);

    // Checking a student's answers
    println!("\nExercise:");
    let mut exercise = ConversionExercise::new(parse("(Lx.Ly.R(x,y))(y)")?, 100)?;
    for answer in ["Ly.R(y,y)", "(Lx.Lz.R(x,z))(y)", "Lz.R(y,z)"] {
        println!("  {answer}: {}", exercise.check_str(answer)?);
    }

    println!("\n=== Done ===");
    Ok(())
}
