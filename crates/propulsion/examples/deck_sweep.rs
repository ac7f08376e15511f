use ndarray::array;
use openconcept_propulsion::EngineDeck;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let deck = EngineDeck::packaged("n3")?;
    println!("{deck}");

    // a short climb/cruise sweep: altitude (ft), Mach, throttle
    let mission = array![
        [0., 0.25, 1.0],
        [10000., 0.45, 0.9],
        [20000., 0.6, 0.85],
        [33000., 0.78, 0.8],
        [37000., 0.8, 0.75],
    ];
    for (point, ev) in mission.rows().into_iter().zip(deck.evaluate_batch(&mission)?) {
        println!(
            "h = {:>7.0} ft  M = {:.2}  throttle = {:.2}  ->  thrust = {:>9.1} N  \
             fuel flow = {:.4} kg/s  dT/dh = {:+.3} N/ft{}",
            point[0],
            point[1],
            point[2],
            ev.outputs["thrust"],
            ev.outputs["fuel_flow"],
            ev.jacobian["thrust"][0],
            if ev.is_out_of_domain() { "  (extrapolated)" } else { "" },
        );
    }
    Ok(())
}
