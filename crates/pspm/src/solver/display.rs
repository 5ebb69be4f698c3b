use std::fmt;

use super::Solver;

/// A diagnostic dump of every species and its records.
impl<M, E> fmt::Display for Solver<M, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} solver: t = {}, {} species, state size {}",
            self.method(),
            self.current_time,
            self.n_species(),
            self.state.len(),
        )?;

        for (k, sp) in self.population.species().iter().enumerate() {
            writeln!(
                f,
                "species {k}: J = {}, start = {}, xb = {}, xm = {}, resident = {}, input flux = {}{}",
                sp.xsize(),
                sp.start_index(),
                sp.xb(),
                sp.xm(),
                sp.is_resident(),
                sp.input_birth_flux(),
                if sp.bfin_is_u0in() { " (u0)" } else { "" },
            )?;
            writeln!(f, "  {}", sp.varnames().join("\t"))?;

            let Ok(it) = sp.iterators(&self.state) else {
                writeln!(f, "  <state does not cover this species>")?;
                continue;
            };
            for record in it.records() {
                let row: Vec<String> = record.iter().map(|v| format!("{v:.6e}")).collect();
                writeln!(f, "  {}", row.join("\t"))?;
            }
        }
        Ok(())
    }
}
