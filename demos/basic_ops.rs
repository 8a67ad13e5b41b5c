//! Basic Operations
//!
//! The minimal example: dot, sliced dot, norms, and when to reach for the
//! compensated variants.
//!
//! | Kernel | Accumulation | Use Case |
//! |--------|--------------|----------|
//! | `dot` | FMA per lane | Well-scaled inputs, throughput |
//! | `dot_compensated` | TwoSum per lane + compensated lane fold | Mixed magnitudes, alternating signs |
//! | `squared_l2_norm` | FMA per lane | Comparison-only (avoids sqrt) |
//! | `l2_norm` | sqrt of the above | Euclidean length |
//!
//! ```bash
//! RUST_LOG=lanedot=debug cargo run --example basic_ops --release
//! ```

use lanedot::{dot, dot_compensated, dot_slice, l2_norm, squared_l2_norm, Kernel, LaneWidth};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!(
        "native lanes: {} ({})",
        lanedot::lane_width(),
        lanedot::backend()
    );

    let a = [2.0, 4.0, 6.0, 8.0];
    let b = [1.0, 3.0, 5.0, 7.0];

    // 2*1 + 4*3 + 6*5 + 8*7 = 100
    let d = dot(&a, &b);
    println!("dot(a, b) = {}", d);
    assert_eq!(d, 100.0);

    // a[1..4] . b[0..3] = 4*1 + 6*3 + 8*5 = 62
    let s = dot_slice(&a, 1, &b, 0, 3);
    println!("dot_slice(a, 1, b, 0, 3) = {}", s);
    assert_eq!(s, 62.0);

    println!("squared_l2_norm([3, 4]) = {}", squared_l2_norm(&[3.0, 4.0]));
    println!("l2_norm([3, 4]) = {}", l2_norm(&[3.0, 4.0]));

    // Magnitude disparity: one large term, many tiny ones.
    let mut x = vec![1e8];
    x.extend(std::iter::repeat(1e-9).take(100_000));
    let ones = vec![1.0; x.len()];
    let exact = 1e8 + 1e-4;

    let plain = dot(&x, &ones);
    let compensated = dot_compensated(&x, &ones);
    println!("\nexact       = {:.12}", exact);
    println!("plain       = {:.12} (err {:.3e})", plain, (plain - exact).abs());
    println!(
        "compensated = {:.12} (err {:.3e})",
        compensated,
        (compensated - exact).abs()
    );

    // Results at a pinned width do not depend on the host.
    println!();
    for n in [1, 2, 4, 8] {
        let k = Kernel::with_lanes(LaneWidth::new(n).expect("valid lane width"));
        println!(
            "lanes={} backend={:<8} plain={:.12} compensated={:.12}",
            n,
            k.backend(),
            k.dot(&x, &ones),
            k.dot_compensated(&x, &ones)
        );
    }
}
