//////////////////////////////////////////////////////////////////////
// tilecut JOBFILE: print the estimate and write the layout picture

#[macro_use]
extern crate error_chain;

use std::env;
use std::path::Path;

use tilecut::errors::*;
use tilecut::job::*;

//////////////////////////////////////////////////////////////////////

fn print_estimate(result: &JobResult) {

    match result {

        JobResult::TileCost { area_m2, cost } => {
            println!("tile area: {:} m2", area_m2);
            println!("tile cost: {:.2}", cost);
        },

        JobResult::Estimate { estimate, image } => {
            println!("area:    {:.2} m2", estimate.area_m2);
            println!("tiles:   {:}", estimate.count);
            println!("reserve: {:}", estimate.reserve);
            println!("total:   {:}", estimate.total);
            if let Some(cost) = estimate.cost {
                println!("cost:    {:.2}", cost);
            }
            println!("wrote {:}", image.display());
        }

    }

}

fn run() -> Result<()> {

    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        bail!("usage: tilecut JOBFILE");
    }

    let filename = Path::new(&args[1]);

    let job = Job::load(filename)?;

    let result = job.run().chain_err(|| format!("running {:}", filename.display()))?;

    print_estimate(&result);

    Ok(())

}

quick_main!(run);
