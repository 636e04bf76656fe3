fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(source) = args.next() else {
        eprintln!("usage: mrc2raw <file.mrc>");
        std::process::exit(2);
    };

    let out = mrc_volume::mrc_to_raw(&source)?;
    println!("{}", out.display());
    Ok(())
}
