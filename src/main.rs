fn main() -> anyhow::Result<()> {
    labelpaint::run()?;
    Ok(())
}
