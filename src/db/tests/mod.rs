mod groups;
mod missed;
mod parts;
mod rules;
