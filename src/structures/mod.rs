/*!
Structures shared by encoders and backends.

- [literal]: Variables and literals, as integers.
- [constraint]: Cardinality constraints and their canonical form.
- [formula]: A recorded formula, for replay into backends.
- [schedule]: Schedules of sensor activity, and the literals which encode them.
*/

pub mod constraint;
pub mod formula;
pub mod literal;
pub mod schedule;
